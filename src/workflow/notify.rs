use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use crate::model::notification::NotificationKind;

/// Appends a notification inside the caller's open transaction so the
/// side-channel write commits or aborts together with the state change
/// that produced it.
async fn push(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    kind: NotificationKind,
    title: &str,
    body: &str,
    data: serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, body, data, read, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(kind.to_string())
    .bind(title)
    .bind(body)
    .bind(data.to_string())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn push_vacation_new_request(
    tx: &mut Transaction<'_, Sqlite>,
    manager_id: &str,
    request_id: &str,
    employee_id: &str,
) -> Result<(), sqlx::Error> {
    push(
        tx,
        manager_id,
        NotificationKind::VacationNewRequest,
        "New vacation request",
        "A new vacation request is waiting for approval",
        json!({
            "request_id": request_id,
            "employee_id": employee_id,
            "status": "PENDING",
        }),
    )
    .await
}

pub async fn push_vacation_approved(
    tx: &mut Transaction<'_, Sqlite>,
    employee_id: &str,
    request_id: &str,
    days_requested: i64,
) -> Result<(), sqlx::Error> {
    push(
        tx,
        employee_id,
        NotificationKind::VacationApproved,
        "Vacation approved",
        "Your vacation request was approved",
        json!({
            "request_id": request_id,
            "status": "APPROVED",
            "days_requested": days_requested,
        }),
    )
    .await
}

pub async fn push_vacation_rejected(
    tx: &mut Transaction<'_, Sqlite>,
    employee_id: &str,
    request_id: &str,
) -> Result<(), sqlx::Error> {
    push(
        tx,
        employee_id,
        NotificationKind::VacationRejected,
        "Vacation rejected",
        "Your vacation request was rejected",
        json!({
            "request_id": request_id,
            "status": "REJECTED",
        }),
    )
    .await
}

pub async fn push_attendance_auto_ended(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    date_key: &str,
    ended_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    push(
        tx,
        user_id,
        NotificationKind::AttendanceAutoEnded,
        "Shift ended automatically",
        "Your shift ran past the daily limit and was closed automatically",
        json!({
            "date_key": date_key,
            "ended_at": ended_at.to_rfc3339(),
        }),
    )
    .await
}
