use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Notification type tag; the client renders a generic list keyed by this.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    VacationNewRequest,
    VacationApproved,
    VacationRejected,
    AttendanceAutoEnded,
}

/// Owned by the recipient; deleted on read, never archived.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[schema(example = "VACATION_APPROVED")]
    pub kind: String,
    pub title: String,
    pub body: String,
    /// JSON payload interpreted per `kind`.
    pub data: String,
    pub read: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
