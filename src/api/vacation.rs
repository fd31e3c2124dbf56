use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::workflow::error::WorkflowError;
use crate::workflow::vacation::{self, DecisionOutcome};

#[derive(Deserialize, ToSchema)]
pub struct CreateVacation {
    #[schema(example = "2026-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-06-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
}

/* =========================
Create vacation request
========================= */
/// Swagger doc for create_request endpoint
#[utoipa::path(
    post,
    path = "/api/vacation",
    request_body(
        content = CreateVacation,
        description = "Vacation request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Vacation request submitted",
         body = Object,
         example = json!({
            "message": "Vacation request submitted",
            "status": "PENDING"
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn create_request(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateVacation>,
) -> actix_web::Result<impl Responder> {
    match vacation::create_request(
        pool.get_ref(),
        &auth.user_id,
        payload.start_date,
        payload.end_date,
        &payload.reason,
    )
    .await
    {
        Ok(request) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Vacation request submitted",
            "status": request.status,
            "request_id": request.id,
            "days_requested": request.days_requested
        }))),
        Err(WorkflowError::InvalidDateRange) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "End date cannot be before start date"
            })))
        }
        Err(WorkflowError::MissingReason) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Please enter a reason"
            })))
        }
        Err(WorkflowError::InsufficientBalance) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Not enough vacation balance"
            })))
        }
        Err(WorkflowError::UserNotFound) => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "User profile not found"
        }))),
        Err(e) => {
            tracing::error!(error = %e, user_id = %auth.user_id, "Failed to create vacation request");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// All requests made by the authenticated employee, newest first
#[utoipa::path(
    get,
    path = "/api/vacation",
    responses(
        (status = 200, description = "Request list", body = [crate::model::vacation_request::VacationRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn my_requests(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    let requests = vacation::requests_for_employee(pool.get_ref(), &auth.user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %auth.user_id, "Failed to list vacation requests");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(requests))
}

/// PENDING requests waiting on the authenticated manager
#[utoipa::path(
    get,
    path = "/api/vacation/pending",
    responses(
        (status = 200, description = "Pending request list", body = [crate::model::vacation_request::VacationRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn pending_requests(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let requests = vacation::pending_for_manager(pool.get_ref(), &auth.user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, manager_id = %auth.user_id, "Failed to list pending requests");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(requests))
}

fn decision_response(outcome: DecisionOutcome, applied_message: &str) -> HttpResponse {
    match outcome {
        DecisionOutcome::Applied => {
            HttpResponse::Ok().json(serde_json::json!({ "message": applied_message }))
        }
        DecisionOutcome::AlreadyDecided => HttpResponse::Ok().json(serde_json::json!({
            "message": "Request already processed"
        })),
    }
}

fn decision_error(e: WorkflowError, request_id: &str, action: &str) -> actix_web::Result<HttpResponse> {
    match e {
        WorkflowError::RequestNotFound => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Vacation request not found"
        }))),
        WorkflowError::UserNotFound => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Employee not found"
        }))),
        WorkflowError::InsufficientBalance => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Not enough balance"
            })))
        }
        e => {
            tracing::error!(error = %e, request_id = %request_id, "{} failed", action);
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/* =========================
Approve vacation (manager)
========================= */
/// Swagger doc for approve_request endpoint
#[utoipa::path(
    put,
    path = "/api/vacation/{request_id}/approve",
    params(
        ("request_id" = String, Path, description = "ID of the vacation request to approve")
    ),
    responses(
        (status = 200, description = "Vacation approved", body = Object, example = json!({
            "message": "Vacation approved"
        })),
        (status = 400, description = "Not enough balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Vacation request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn approve_request(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let request_id = path.into_inner();
    match vacation::approve_request(pool.get_ref(), &request_id).await {
        Ok(outcome) => Ok(decision_response(outcome, "Vacation approved")),
        Err(e) => decision_error(e, &request_id, "Approve vacation"),
    }
}

/* =========================
Reject vacation (manager)
========================= */
/// Swagger doc for reject_request endpoint
#[utoipa::path(
    put,
    path = "/api/vacation/{request_id}/reject",
    params(
        ("request_id" = String, Path, description = "ID of the vacation request to reject")
    ),
    responses(
        (status = 200, description = "Vacation rejected", body = Object, example = json!({
            "message": "Vacation rejected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Vacation request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn reject_request(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let request_id = path.into_inner();
    match vacation::reject_request(pool.get_ref(), &request_id).await {
        Ok(outcome) => Ok(decision_response(outcome, "Vacation rejected")),
        Err(e) => decision_error(e, &request_id, "Reject vacation"),
    }
}
