use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::user::User;
use crate::utils::company_cache;
use crate::workflow::accrual;

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub company_id: String,
    /// First six characters of the company id, upper-cased
    #[schema(example = "ACME01")]
    pub company_short_id: String,
    pub company_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub join_date: Option<NaiveDate>,
    pub vacation_days_per_month: f64,
    pub vacation_balance: f64,
    #[schema(value_type = Option<String>, format = "date")]
    pub last_accrual_date: Option<NaiveDate>,
    pub is_shift_active: bool,
    /// Local wall-clock start of the running shift, `HH:MM`
    #[schema(example = "08:30")]
    pub today_start_time: Option<String>,
}

fn short_company_id(company_id: &str) -> String {
    company_id
        .trim()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase()
}

/// Profile/home endpoint. Loading it also runs the daily vacation accrual,
/// so the returned balance is current as of today.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile and balances", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn me(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    // Accrual failures must not block the profile; the stored balance is
    // shown as-is in that case.
    if let Err(e) = accrual::run_daily_accrual(pool.get_ref(), &auth.user_id, config.company_tz).await
    {
        tracing::warn!(error = %e, user_id = %auth.user_id, "Daily accrual failed");
    }

    let user: Option<User> = sqlx::query_as(
        r#"
        SELECT id, company_id, full_name, email, role, direct_manager_id, join_date,
               vacation_days_per_month, vacation_balance, last_accrual_date,
               active_attendance, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(&auth.user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = %auth.user_id, "Failed to load profile");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(user) = user else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "User profile not found"
        })));
    };

    let company_name = company_cache::company_name(pool.get_ref(), &user.company_id).await;

    let today_start_time = user.active_shift().map(|active| {
        active
            .started_at
            .with_timezone(&config.company_tz)
            .format("%H:%M")
            .to_string()
    });

    let response = ProfileResponse {
        full_name: user.full_name,
        email: user.email,
        role: user.role,
        company_short_id: short_company_id(&user.company_id),
        company_id: user.company_id,
        company_name,
        join_date: user.join_date,
        vacation_days_per_month: user.vacation_days_per_month,
        vacation_balance: user.vacation_balance,
        last_accrual_date: user.last_accrual_date,
        is_shift_active: today_start_time.is_some(),
        today_start_time,
    };

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::short_company_id;

    #[test]
    fn company_short_id_is_six_upper_chars() {
        assert_eq!(short_company_id("acme01xyz"), "ACME01");
        assert_eq!(short_company_id("ab"), "AB");
    }
}
