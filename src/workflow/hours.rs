use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::model::attendance::Period;
use crate::workflow::error::WorkflowError;
use crate::workflow::shift::MAX_SHIFT_HOURS;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Total worked hours for one user in one company for one month
/// (`month_key` = `%Y-%m`). Blank input reads as `0.0` rather than an
/// error: this feeds a summary display, not a payroll record.
pub async fn monthly_hours(
    pool: &SqlitePool,
    user_id: &str,
    company_id: &str,
    month_key: &str,
) -> Result<f64, WorkflowError> {
    if user_id.trim().is_empty() || company_id.trim().is_empty() || month_key.trim().is_empty() {
        return Ok(0.0);
    }

    let rows: Vec<(String, String, String)> =
        sqlx::query_as("SELECT id, date_key, periods FROM attendance WHERE user_id = ? AND company_id = ?")
            .bind(user_id)
            .bind(company_id)
            .fetch_all(pool)
            .await?;

    let now = Utc::now();
    let mut total = 0.0;
    for (entry_id, date_key, raw_periods) in rows {
        if !entry_in_month(&entry_id, &date_key, user_id, month_key) {
            continue;
        }
        // a row whose periods column will not parse contributes nothing
        let Ok(periods) = serde_json::from_str::<Vec<Period>>(&raw_periods) else {
            continue;
        };
        total += sum_period_hours(&periods, now);
    }

    Ok(total)
}

/// Month membership by `date_key` prefix, with the entry-id prefix as a
/// second check against clock-skew-induced key mismatches.
pub fn entry_in_month(entry_id: &str, date_key: &str, user_id: &str, month_key: &str) -> bool {
    date_key.starts_with(month_key) || entry_id.starts_with(&format!("{}_{}", user_id, month_key))
}

/// Sums period durations in hours: open periods count up to `now`, every
/// period is capped at 13 hours, non-positive durations are skipped.
pub fn sum_period_hours(periods: &[Period], now: DateTime<Utc>) -> f64 {
    let cap_ms = MAX_SHIFT_HOURS * 3_600_000;

    periods
        .iter()
        .filter_map(|p| {
            let end = p.end_at.unwrap_or(now);
            let duration_ms = (end - p.start_at).num_milliseconds().min(cap_ms);
            (duration_ms > 0).then_some(duration_ms as f64 / MS_PER_HOUR)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use crate::workflow::shift::LEDGER_TTL_DAYS;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, day, h, m, 0).unwrap()
    }

    fn period(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Period {
        Period {
            start_at: start,
            end_at: end,
            start_location: None,
            end_location: None,
        }
    }

    #[test]
    fn open_period_counts_up_to_now() {
        // [10:00-14:00] + [15:00-open], observed at 17:00 => 4h + 2h
        let periods = vec![
            period(at(10, 10, 0), Some(at(10, 14, 0))),
            period(at(10, 15, 0), None),
        ];
        let total = sum_period_hours(&periods, at(10, 17, 0));
        assert!((total - 6.0).abs() < 1e-9);
    }

    #[test]
    fn single_period_is_capped_at_thirteen_hours() {
        // 26h period contributes exactly 13h
        let periods = vec![period(at(1, 8, 0), Some(at(2, 10, 0)))];
        let total = sum_period_hours(&periods, at(3, 0, 0));
        assert!((total - 13.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_durations_are_skipped() {
        let periods = vec![period(at(10, 14, 0), Some(at(10, 14, 0)))];
        assert_eq!(sum_period_hours(&periods, at(10, 17, 0)), 0.0);
    }

    #[test]
    fn month_filter_accepts_either_prefix() {
        assert!(entry_in_month("u1_2026-02-10", "2026-02-10", "u1", "2026-02"));
        // mismatched date_key rescued by the entry-id prefix
        assert!(entry_in_month("u1_2026-02-28", "2026-03-01", "u1", "2026-02"));
        assert!(!entry_in_month("u1_2026-03-01", "2026-03-01", "u1", "2026-02"));
    }

    #[tokio::test]
    async fn blank_input_reads_as_zero() {
        let pool = init_memory_db().await;
        assert_eq!(monthly_hours(&pool, "", "c1", "2026-02").await.unwrap(), 0.0);
        assert_eq!(monthly_hours(&pool, "u1", "c1", " ").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn aggregates_only_the_requested_month() {
        let pool = init_memory_db().await;

        let insert = |entry_id: &str, date_key: &str, periods: Vec<Period>| {
            let pool = pool.clone();
            let entry_id = entry_id.to_string();
            let date_key = date_key.to_string();
            async move {
                sqlx::query(
                    r#"
                    INSERT INTO attendance (id, company_id, user_id, date_key, periods, updated_at, expires_at)
                    VALUES (?, 'c1', 'u1', ?, ?, ?, ?)
                    "#,
                )
                .bind(entry_id)
                .bind(date_key)
                .bind(serde_json::to_string(&periods).unwrap())
                .bind(Utc::now())
                .bind(Utc::now() + Duration::days(LEDGER_TTL_DAYS))
                .execute(&pool)
                .await
                .unwrap();
            }
        };

        insert(
            "u1_2026-02-10",
            "2026-02-10",
            vec![period(at(10, 9, 0), Some(at(10, 17, 0)))],
        )
        .await;
        insert(
            "u1_2026-03-01",
            "2026-03-01",
            vec![period(
                Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
                Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
            )],
        )
        .await;

        let total = monthly_hours(&pool, "u1", "c1", "2026-02").await.unwrap();
        assert!((total - 8.0).abs() < 1e-9);
    }
}
