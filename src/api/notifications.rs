use actix_web::{HttpResponse, Responder, web};
use sqlx::SqlitePool;

use crate::auth::auth::AuthUser;
use crate::model::notification::Notification;

/// Notification list endpoint, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Notifications for the authenticated user", body = [Notification]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    let notifications: Vec<Notification> = sqlx::query_as(
        r#"
        SELECT id, user_id, kind, title, body, data, read, created_at
        FROM notifications
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(&auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = %auth.user_id, "Failed to fetch notifications");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(notifications))
}

/// Reading a notification removes it; there is no archive.
#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/read",
    params(
        ("notification_id" = String, Path, description = "ID of the notification being read")
    ),
    responses(
        (status = 200, description = "Notification dismissed", body = Object, example = json!({
            "message": "Notification dismissed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn read_notification(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let notification_id = path.into_inner();

    let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
        .bind(&notification_id)
        .bind(&auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, notification_id = %notification_id, "Failed to dismiss notification");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Notification not found"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Notification dismissed"
    })))
}
