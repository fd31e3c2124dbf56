use chrono::{Datelike, Duration, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::workflow::error::WorkflowError;

/// Users with an accrual run currently in flight in this process. Not a
/// distributed lock: two devices/processes can still race, which matches
/// the source system's guarantees.
static IN_FLIGHT: Lazy<Mutex<HashSet<String>>> = Lazy::new(Default::default);

struct InFlightGuard(String);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        IN_FLIGHT.lock().unwrap().remove(&self.0);
    }
}

fn days_in_month(day: NaiveDate) -> f64 {
    let first = day.with_day(1).unwrap_or(day);
    let next = first + Months::new(1);
    (next - first).num_days() as f64
}

/// Prorated vacation days earned between `last_accrual` (exclusive) and
/// `today` (inclusive): each qualifying day contributes
/// `monthly_quota / days_in_that_month`. Days before the join date never
/// qualify.
pub fn daily_accrual(
    monthly_quota: f64,
    join_date: NaiveDate,
    last_accrual: NaiveDate,
    today: NaiveDate,
) -> f64 {
    if monthly_quota <= 0.0 {
        return 0.0;
    }

    let mut day = last_accrual.max(join_date - Duration::days(1));
    let mut earned = 0.0;
    while day < today {
        day = day + Duration::days(1);
        if day >= join_date {
            earned += monthly_quota / days_in_month(day);
        }
    }
    earned
}

/// Applies pending accrual to a user's balance and advances
/// `last_accrual_date` to today (company timezone). Returns the new
/// balance, or `None` when there was nothing to do (already accrued today,
/// missing join date / quota, or a run already in flight for this user).
pub async fn run_daily_accrual(
    pool: &SqlitePool,
    user_id: &str,
    tz: Tz,
) -> Result<Option<f64>, WorkflowError> {
    if !IN_FLIGHT.lock().unwrap().insert(user_id.to_string()) {
        return Ok(None);
    }
    let _guard = InFlightGuard(user_id.to_string());

    let row: Option<(Option<NaiveDate>, f64, f64, Option<NaiveDate>)> = sqlx::query_as(
        "SELECT join_date, vacation_days_per_month, vacation_balance, last_accrual_date \
         FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    let Some((join_date, quota, balance, last_accrual)) = row else {
        return Ok(None);
    };
    let Some(join_date) = join_date else {
        return Ok(None);
    };
    if quota <= 0.0 {
        return Ok(None);
    }

    let today = Utc::now().with_timezone(&tz).date_naive();
    let last_accrual = last_accrual.unwrap_or(join_date - Duration::days(1));
    if last_accrual >= today {
        return Ok(None);
    }

    let new_balance = balance + daily_accrual(quota, join_date, last_accrual, today);
    sqlx::query("UPDATE users SET vacation_balance = ?, last_accrual_date = ? WHERE id = ?")
        .bind(new_balance)
        .bind(today)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(Some(new_balance))
}
