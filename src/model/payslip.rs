use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payslip metadata, one row per (employee, month). The PDF itself lives in
/// the `payload` column as base64 and is only selected on download.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PayslipMeta {
    pub employee_id: String,
    #[schema(example = "2026-02")]
    pub period_key: String,
    pub company_id: String,
    pub year: i64,
    pub month: i64,
    pub file_name: String,
    pub uploaded_by: String,
    #[schema(value_type = String, format = "date-time")]
    pub uploaded_at: DateTime<Utc>,
}

impl PayslipMeta {
    pub fn period_key_for(year: i64, month: i64) -> String {
        format!("{:04}-{:02}", year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::PayslipMeta;

    #[test]
    fn period_key_is_zero_padded() {
        assert_eq!(PayslipMeta::period_key_for(2026, 2), "2026-02");
        assert_eq!(PayslipMeta::period_key_for(2026, 11), "2026-11");
    }
}
