use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::{ActiveShift, GeoPoint, LedgerEntry, Period};
use crate::workflow::error::WorkflowError;
use crate::workflow::events::ShiftEvents;
use crate::workflow::shift::{self, ShiftOutcome, date_key_for};
use crate::workflow::hours;

#[derive(Deserialize, ToSchema)]
pub struct ShiftAction {
    /// Optional geo fix recorded on the period boundary
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize, ToSchema)]
pub struct ForcedShiftEnd {
    #[schema(example = "2026-02-10T21:00:00Z", value_type = Option<String>, format = "date-time")]
    pub forced_end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Serialize, ToSchema)]
pub struct ShiftStateResponse {
    pub is_active: bool,
    /// The open day's key while a shift runs, otherwise today's key
    #[schema(example = "2026-02-10")]
    pub active_date_key: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DayQuery {
    /// Calendar day to list, defaults to today in the company timezone
    #[param(example = "2026-02-10")]
    pub date_key: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DayPeriodsResponse {
    pub date_key: String,
    pub periods: Vec<Period>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    /// Month to aggregate (`yyyy-MM`), defaults to the current month
    #[param(example = "2026-02")]
    pub month_key: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyHoursResponse {
    #[schema(example = "2026-02")]
    pub month_key: String,
    #[schema(example = 152.5)]
    pub hours: f64,
}

fn outcome_response(outcome: ShiftOutcome) -> HttpResponse {
    let message = match outcome {
        ShiftOutcome::Started => "Shift started",
        ShiftOutcome::Ended => "Shift ended",
        ShiftOutcome::AlreadyStarted => "A shift is already running",
        ShiftOutcome::NotStarted => "No shift is currently running",
        ShiftOutcome::Error => "Invalid request",
    };
    HttpResponse::Ok().json(serde_json::json!({ "result": outcome, "message": message }))
}

/// Start shift endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/start",
    request_body = ShiftAction,
    responses(
        (status = 200, description = "Outcome of the transition", body = Object, example = json!({
            "result": "STARTED",
            "message": "Shift started"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User profile not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn start_shift(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    events: web::Data<ShiftEvents>,
    payload: web::Json<ShiftAction>,
) -> actix_web::Result<impl Responder> {
    match shift::start_shift(
        pool.get_ref(),
        events.get_ref(),
        &auth.user_id,
        &auth.company_id,
        config.company_tz,
        payload.location,
    )
    .await
    {
        Ok(outcome) => Ok(outcome_response(outcome)),
        Err(WorkflowError::UserNotFound) => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "User profile not found"
        }))),
        Err(e) => {
            tracing::error!(error = %e, user_id = %auth.user_id, "Start shift failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// End shift endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/end",
    request_body = ShiftAction,
    responses(
        (status = 200, description = "Outcome of the transition", body = Object, example = json!({
            "result": "ENDED",
            "message": "Shift ended"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn end_shift(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    events: web::Data<ShiftEvents>,
    payload: web::Json<ShiftAction>,
) -> actix_web::Result<impl Responder> {
    match shift::end_shift(pool.get_ref(), events.get_ref(), &auth.user_id, payload.location).await
    {
        Ok(outcome) => Ok(outcome_response(outcome)),
        Err(e) => {
            tracing::error!(error = %e, user_id = %auth.user_id, "End shift failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Forced end endpoint: closes the open shift at a supplied time, clamped
/// into the 13-hour window
#[utoipa::path(
    post,
    path = "/api/attendance/end-at",
    request_body = ForcedShiftEnd,
    responses(
        (status = 200, description = "Outcome of the transition"),
        (status = 400, description = "Missing forced end timestamp", body = Object, example = json!({
            "result": "ERROR",
            "message": "forced_end_at is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn end_shift_at(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    events: web::Data<ShiftEvents>,
    payload: web::Json<ForcedShiftEnd>,
) -> actix_web::Result<impl Responder> {
    let Some(forced_end_at) = payload.forced_end_at else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "result": ShiftOutcome::Error,
            "message": "forced_end_at is required"
        })));
    };

    match shift::end_shift_at(
        pool.get_ref(),
        events.get_ref(),
        &auth.user_id,
        forced_end_at,
        payload.location,
    )
    .await
    {
        Ok(outcome) => Ok(outcome_response(outcome)),
        Err(e) => {
            tracing::error!(error = %e, user_id = %auth.user_id, "Forced shift end failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Current shift state for the authenticated user
#[utoipa::path(
    get,
    path = "/api/attendance/state",
    responses(
        (status = 200, description = "Active flag and day key", body = ShiftStateResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn shift_state(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let raw: Option<Option<String>> =
        sqlx::query_scalar("SELECT active_attendance FROM users WHERE id = ?")
            .bind(&auth.user_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = %auth.user_id, "Failed to read shift state");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let marker: Option<ActiveShift> = raw
        .flatten()
        .and_then(|r| serde_json::from_str(&r).ok());

    let response = match marker {
        Some(active) => ShiftStateResponse {
            is_active: true,
            active_date_key: active.date_key,
            started_at: Some(active.started_at),
        },
        None => ShiftStateResponse {
            is_active: false,
            active_date_key: date_key_for(Utc::now(), config.company_tz),
            started_at: None,
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// One day's period list
#[utoipa::path(
    get,
    path = "/api/attendance/periods",
    params(DayQuery),
    responses(
        (status = 200, description = "Ordered period list for the day", body = DayPeriodsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn day_periods(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    query: web::Query<DayQuery>,
) -> actix_web::Result<impl Responder> {
    let date_key = query
        .date_key
        .clone()
        .unwrap_or_else(|| date_key_for(Utc::now(), config.company_tz));
    let entry_id = LedgerEntry::entry_id(&auth.user_id, &date_key);

    let raw: Option<String> = sqlx::query_scalar("SELECT periods FROM attendance WHERE id = ?")
        .bind(&entry_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, entry_id = %entry_id, "Failed to read day periods");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let periods: Vec<Period> = raw
        .and_then(|r| serde_json::from_str(&r).ok())
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(DayPeriodsResponse { date_key, periods }))
}

/// Monthly worked-hours summary. Fail-open: storage errors read as 0.0
/// because this feeds a display, not payroll.
#[utoipa::path(
    get,
    path = "/api/attendance/monthly-hours",
    params(MonthQuery),
    responses(
        (status = 200, description = "Capped total for the month", body = MonthlyHoursResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly_hours(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let month_key = query.month_key.clone().unwrap_or_else(|| {
        Utc::now()
            .with_timezone(&config.company_tz)
            .format("%Y-%m")
            .to_string()
    });

    let hours = match hours::monthly_hours(
        pool.get_ref(),
        &auth.user_id,
        &auth.company_id,
        &month_key,
    )
    .await
    {
        Ok(total) => total,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %auth.user_id, month_key = %month_key, "Monthly hours aggregation failed");
            0.0
        }
    };

    Ok(HttpResponse::Ok().json(MonthlyHoursResponse { month_key, hours }))
}
