use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::model::payslip::PayslipMeta;
use crate::workflow::error::WorkflowError;

/// Raw PDF size cap, checked against the decoded payload.
pub const MAX_PAYSLIP_BYTES: usize = 700 * 1024;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayslipOutcome {
    Uploaded,
    AlreadyExists,
    Deleted,
    Error,
}

/// Stores one payslip per (employee, month). The period key is reserved
/// inside a transaction so a concurrent duplicate upload observes
/// `AlreadyExists` instead of overwriting.
pub async fn upload_payslip(
    pool: &SqlitePool,
    employee_id: &str,
    company_id: &str,
    year: i64,
    month: i64,
    file_name: Option<String>,
    payload_base64: &str,
    uploaded_by: &str,
) -> Result<PayslipOutcome, WorkflowError> {
    if !(1..=12).contains(&month) {
        return Err(WorkflowError::InvalidPayload("month must be between 1 and 12"));
    }

    let raw = STANDARD
        .decode(payload_base64)
        .map_err(|_| WorkflowError::InvalidPayload("payload is not valid base64"))?;
    if raw.is_empty() {
        return Err(WorkflowError::InvalidPayload("payload is empty"));
    }
    if raw.len() > MAX_PAYSLIP_BYTES {
        return Err(WorkflowError::PayloadTooLarge { size: raw.len() });
    }

    let period_key = PayslipMeta::period_key_for(year, month);
    let file_name = file_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{}.pdf", period_key));

    let mut tx = pool.begin().await?;

    let exists: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM payslips WHERE employee_id = ? AND period_key = ?")
            .bind(employee_id)
            .bind(&period_key)
            .fetch_optional(&mut *tx)
            .await?;
    if exists.is_some() {
        return Ok(PayslipOutcome::AlreadyExists);
    }

    sqlx::query(
        r#"
        INSERT INTO payslips
            (employee_id, period_key, company_id, year, month, file_name, payload,
             uploaded_by, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(&period_key)
    .bind(company_id)
    .bind(year)
    .bind(month)
    .bind(&file_name)
    .bind(payload_base64)
    .bind(uploaded_by)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(PayslipOutcome::Uploaded)
}

/// Newest first; the payload column is deliberately not selected here.
pub async fn list_payslips(
    pool: &SqlitePool,
    employee_id: &str,
) -> Result<Vec<PayslipMeta>, WorkflowError> {
    Ok(sqlx::query_as(
        r#"
        SELECT employee_id, period_key, company_id, year, month, file_name,
               uploaded_by, uploaded_at
        FROM payslips
        WHERE employee_id = ?
        ORDER BY period_key DESC
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?)
}

/// File name + base64 payload for one period, if present.
pub async fn payslip_payload(
    pool: &SqlitePool,
    employee_id: &str,
    period_key: &str,
) -> Result<Option<(String, String)>, WorkflowError> {
    Ok(sqlx::query_as(
        "SELECT file_name, payload FROM payslips WHERE employee_id = ? AND period_key = ?",
    )
    .bind(employee_id)
    .bind(period_key)
    .fetch_optional(pool)
    .await?)
}

/// Removing an absent payslip still reports `Deleted`.
pub async fn delete_payslip(
    pool: &SqlitePool,
    employee_id: &str,
    period_key: &str,
) -> Result<PayslipOutcome, WorkflowError> {
    sqlx::query("DELETE FROM payslips WHERE employee_id = ? AND period_key = ?")
        .bind(employee_id)
        .bind(period_key)
        .execute(pool)
        .await?;
    Ok(PayslipOutcome::Deleted)
}
