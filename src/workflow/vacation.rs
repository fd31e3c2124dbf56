use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::vacation_request::{VacationRequest, VacationStatus};
use crate::workflow::error::WorkflowError;
use crate::workflow::notify;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Applied,
    /// The request was already approved or rejected; the call is a no-op.
    AlreadyDecided,
}

/// Requested days are inclusive of both endpoints.
pub fn days_requested(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    (end_date - start_date).num_days() + 1
}

/// Creates a PENDING request and notifies the employee's manager in the
/// same transaction. The balance check here is a soft pre-check; the
/// authoritative one runs at approval time.
pub async fn create_request(
    pool: &SqlitePool,
    employee_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: &str,
) -> Result<VacationRequest, WorkflowError> {
    if reason.trim().is_empty() {
        return Err(WorkflowError::MissingReason);
    }
    if end_date < start_date {
        return Err(WorkflowError::InvalidDateRange);
    }
    let days = days_requested(start_date, end_date);

    let row: Option<(Option<String>, f64)> =
        sqlx::query_as("SELECT direct_manager_id, vacation_balance FROM users WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(pool)
            .await?;
    let Some((manager_id, balance)) = row else {
        return Err(WorkflowError::UserNotFound);
    };
    if days as f64 > balance {
        return Err(WorkflowError::InsufficientBalance);
    }

    let request = VacationRequest {
        id: Uuid::new_v4().to_string(),
        employee_id: employee_id.to_string(),
        manager_id,
        start_date,
        end_date,
        reason: reason.trim().to_string(),
        status: VacationStatus::Pending.to_string(),
        days_requested: days,
        created_at: Utc::now(),
        decision_at: None,
        manager_comment: None,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO vacation_requests
            (id, employee_id, manager_id, start_date, end_date, reason, status,
             days_requested, created_at, decision_at, manager_comment)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL)
        "#,
    )
    .bind(&request.id)
    .bind(&request.employee_id)
    .bind(&request.manager_id)
    .bind(request.start_date)
    .bind(request.end_date)
    .bind(&request.reason)
    .bind(&request.status)
    .bind(request.days_requested)
    .bind(request.created_at)
    .execute(&mut *tx)
    .await?;

    if let Some(manager_id) = request.manager_id.as_deref() {
        notify::push_vacation_new_request(&mut tx, manager_id, &request.id, employee_id).await?;
    }

    tx.commit().await?;
    Ok(request)
}

/// Approves a request and deducts the employee's balance atomically.
/// Idempotent on already-decided requests; aborts with no partial effects
/// when the balance would go negative.
pub async fn approve_request(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<DecisionOutcome, WorkflowError> {
    let mut tx = pool.begin().await?;

    let row: Option<(String, i64, String)> =
        sqlx::query_as("SELECT employee_id, days_requested, status FROM vacation_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some((employee_id, days, status)) = row else {
        return Err(WorkflowError::RequestNotFound);
    };
    if status.parse::<VacationStatus>().is_ok_and(|s| s.is_terminal()) {
        return Ok(DecisionOutcome::AlreadyDecided);
    }

    let balance: Option<f64> = sqlx::query_scalar("SELECT vacation_balance FROM users WHERE id = ?")
        .bind(&employee_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(balance) = balance else {
        return Err(WorkflowError::UserNotFound);
    };

    let new_balance = balance - days as f64;
    if new_balance < 0.0 {
        return Err(WorkflowError::InsufficientBalance);
    }

    sqlx::query("UPDATE vacation_requests SET status = ?, decision_at = ? WHERE id = ?")
        .bind(VacationStatus::Approved.to_string())
        .bind(Utc::now())
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET vacation_balance = ? WHERE id = ?")
        .bind(new_balance)
        .bind(&employee_id)
        .execute(&mut *tx)
        .await?;

    notify::push_vacation_approved(&mut tx, &employee_id, request_id, days).await?;

    tx.commit().await?;
    Ok(DecisionOutcome::Applied)
}

/// Rejects a request. Same idempotency guard as approval; no balance change.
pub async fn reject_request(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<DecisionOutcome, WorkflowError> {
    let mut tx = pool.begin().await?;

    let row: Option<(String, String)> =
        sqlx::query_as("SELECT employee_id, status FROM vacation_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some((employee_id, status)) = row else {
        return Err(WorkflowError::RequestNotFound);
    };
    if status.parse::<VacationStatus>().is_ok_and(|s| s.is_terminal()) {
        return Ok(DecisionOutcome::AlreadyDecided);
    }

    sqlx::query("UPDATE vacation_requests SET status = ?, decision_at = ? WHERE id = ?")
        .bind(VacationStatus::Rejected.to_string())
        .bind(Utc::now())
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    notify::push_vacation_rejected(&mut tx, &employee_id, request_id).await?;

    tx.commit().await?;
    Ok(DecisionOutcome::Applied)
}

const REQUEST_COLUMNS: &str = "id, employee_id, manager_id, start_date, end_date, reason, status, \
     days_requested, created_at, decision_at, manager_comment";

/// All PENDING requests waiting on a specific manager.
pub async fn pending_for_manager(
    pool: &SqlitePool,
    manager_id: &str,
) -> Result<Vec<VacationRequest>, WorkflowError> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM vacation_requests \
         WHERE manager_id = ? AND status = 'PENDING' ORDER BY created_at ASC"
    );
    Ok(sqlx::query_as(&sql).bind(manager_id).fetch_all(pool).await?)
}

/// Every request a specific employee has made, newest first.
pub async fn requests_for_employee(
    pool: &SqlitePool,
    employee_id: &str,
) -> Result<Vec<VacationRequest>, WorkflowError> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM vacation_requests \
         WHERE employee_id = ? ORDER BY created_at DESC"
    );
    Ok(sqlx::query_as(&sql).bind(employee_id).fetch_all(pool).await?)
}
