use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VacationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VacationStatus {
    /// APPROVED and REJECTED are terminal: no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, VacationStatus::Approved | VacationStatus::Rejected)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct VacationRequest {
    #[schema(example = "7c9e6679-7425-40de-944b-e07fc1f90ae7")]
    pub id: String,
    pub employee_id: String,
    pub manager_id: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: String,
    #[schema(example = "PENDING")]
    pub status: String,
    pub days_requested: i64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decision_at: Option<DateTime<Utc>>,
    pub manager_comment: Option<String>,
}

impl VacationRequest {
    pub fn status(&self) -> Option<VacationStatus> {
        self.status.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_the_stored_column_values() {
        assert_eq!(VacationStatus::Pending.to_string(), "PENDING");
        assert_eq!("APPROVED".parse::<VacationStatus>().unwrap(), VacationStatus::Approved);
        assert!(VacationStatus::Approved.is_terminal());
        assert!(VacationStatus::Rejected.is_terminal());
        assert!(!VacationStatus::Pending.is_terminal());
    }
}
