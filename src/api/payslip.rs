use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::payslip::PayslipMeta;
use crate::workflow::error::WorkflowError;
use crate::workflow::payslip::{self, PayslipOutcome};

#[derive(Deserialize, ToSchema)]
pub struct UploadPayslip {
    pub employee_id: String,
    #[schema(example = 2026)]
    pub year: i64,
    #[schema(example = 2)]
    pub month: i64,
    #[schema(example = "2026-02.pdf")]
    pub file_name: Option<String>,
    /// PDF document, base64-encoded; decoded size is capped at 700 KiB
    pub content_base64: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayslipQuery {
    /// Managers may address another employee; employees always read their own
    pub employee_id: Option<String>,
}

/// Employees may only act on their own payslips; managers may address any.
fn resolve_employee(auth: &AuthUser, requested: Option<&str>) -> String {
    match requested {
        Some(id) if !auth.is_employee() => id.to_string(),
        _ => auth.user_id.clone(),
    }
}

/// Payslip upload endpoint (manager)
#[utoipa::path(
    post,
    path = "/api/payslips/upload",
    request_body = UploadPayslip,
    responses(
        (status = 201, description = "Payslip stored", body = Object, example = json!({
            "result": "UPLOADED",
            "period_key": "2026-02"
        })),
        (status = 400, description = "Duplicate period or invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payslips"
)]
pub async fn upload_payslip(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<UploadPayslip>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    match payslip::upload_payslip(
        pool.get_ref(),
        &payload.employee_id,
        &auth.company_id,
        payload.year,
        payload.month,
        payload.file_name.clone(),
        &payload.content_base64,
        &auth.user_id,
    )
    .await
    {
        Ok(PayslipOutcome::Uploaded) => Ok(HttpResponse::Created().json(serde_json::json!({
            "result": PayslipOutcome::Uploaded,
            "period_key": PayslipMeta::period_key_for(payload.year, payload.month)
        }))),
        Ok(PayslipOutcome::AlreadyExists) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "result": PayslipOutcome::AlreadyExists,
                "message": "A payslip for this period already exists"
            })))
        }
        Ok(_) => Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "result": PayslipOutcome::Error,
            "message": "Invalid payslip request"
        }))),
        Err(WorkflowError::InvalidPayload(reason)) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "result": PayslipOutcome::Error,
                "message": reason
            })))
        }
        Err(WorkflowError::PayloadTooLarge { size }) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "result": PayslipOutcome::Error,
                "message": format!("Document too large: {} bytes", size)
            })))
        }
        Err(e) => {
            tracing::error!(error = %e, employee_id = %payload.employee_id, "Payslip upload failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Payslip metadata list, newest period first
#[utoipa::path(
    get,
    path = "/api/payslips",
    params(PayslipQuery),
    responses(
        (status = 200, description = "Payslip metadata", body = [PayslipMeta]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payslips"
)]
pub async fn list_payslips(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PayslipQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = resolve_employee(&auth, query.employee_id.as_deref());

    let slips = payslip::list_payslips(pool.get_ref(), &employee_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id = %employee_id, "Failed to list payslips");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(slips))
}

/// Payslip download endpoint: returns the stored base64 document
#[utoipa::path(
    get,
    path = "/api/payslips/{period_key}",
    params(
        ("period_key" = String, Path, description = "Payslip period, yyyy-MM"),
        PayslipQuery
    ),
    responses(
        (status = 200, description = "Payslip document", body = Object, example = json!({
            "period_key": "2026-02",
            "file_name": "2026-02.pdf",
            "content_base64": "JVBERi0..."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Payslip not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payslips"
)]
pub async fn get_payslip(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    query: web::Query<PayslipQuery>,
) -> actix_web::Result<impl Responder> {
    let period_key = path.into_inner();
    let employee_id = resolve_employee(&auth, query.employee_id.as_deref());

    let document = payslip::payslip_payload(pool.get_ref(), &employee_id, &period_key)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id = %employee_id, period_key = %period_key, "Failed to fetch payslip");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match document {
        Some((file_name, content_base64)) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "period_key": period_key,
            "file_name": file_name,
            "content_base64": content_base64
        }))),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Payslip not found"
        }))),
    }
}

/// Payslip delete endpoint (manager)
#[utoipa::path(
    delete,
    path = "/api/payslips/{period_key}",
    params(
        ("period_key" = String, Path, description = "Payslip period, yyyy-MM"),
        PayslipQuery
    ),
    responses(
        (status = 200, description = "Payslip removed", body = Object, example = json!({
            "result": "DELETED"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payslips"
)]
pub async fn delete_payslip(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    query: web::Query<PayslipQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let period_key = path.into_inner();
    let employee_id = resolve_employee(&auth, query.employee_id.as_deref());

    let outcome = payslip::delete_payslip(pool.get_ref(), &employee_id, &period_key)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id = %employee_id, period_key = %period_key, "Failed to delete payslip");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "result": outcome })))
}
