use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::attendance::ActiveShift;

/// User row. The `active_attendance` column holds the JSON-encoded
/// active-shift marker; NULL means no shift is open.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub company_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub direct_manager_id: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub vacation_days_per_month: f64,
    pub vacation_balance: f64,
    pub last_accrual_date: Option<NaiveDate>,
    pub active_attendance: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Decodes the active-shift marker; a malformed column reads as absent.
    pub fn active_shift(&self) -> Option<ActiveShift> {
        self.active_attendance
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
