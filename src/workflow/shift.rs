use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::model::attendance::{ActiveShift, GeoPoint, LedgerEntry, Period};
use crate::workflow::error::WorkflowError;
use crate::workflow::events::{ShiftEvent, ShiftEvents};
use crate::workflow::notify;

/// Hard cap on a single shift. Forced end times are clamped to it and the
/// watchdog force-ends anything open longer.
pub const MAX_SHIFT_HOURS: i64 = 13;

/// Ledger rows carry a TTL attribute instead of ever being deleted; the
/// expiry is refreshed on every write.
pub const LEDGER_TTL_DAYS: i64 = 370;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftOutcome {
    Started,
    Ended,
    AlreadyStarted,
    NotStarted,
    Error,
}

/// Calendar day in the company timezone, `%Y-%m-%d`.
pub fn date_key_for(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// Clamps a caller-supplied end time into `[start_at, start_at + 13h]`.
pub fn clamp_forced_end(start_at: DateTime<Utc>, forced_end_at: DateTime<Utc>) -> DateTime<Utc> {
    let cap = start_at + Duration::hours(MAX_SHIFT_HOURS);
    forced_end_at.max(start_at).min(cap)
}

/// Opens a shift: appends an open period to today's ledger entry and sets
/// the active-shift marker, both in one transaction. Idempotent: a second
/// start while a shift is open is a no-op reporting `AlreadyStarted`.
pub async fn start_shift(
    pool: &SqlitePool,
    events: &ShiftEvents,
    user_id: &str,
    company_id: &str,
    tz: Tz,
    location: Option<GeoPoint>,
) -> Result<ShiftOutcome, WorkflowError> {
    let now = Utc::now();
    let date_key = date_key_for(now, tz);
    let entry_id = LedgerEntry::entry_id(user_id, &date_key);

    let mut tx = pool.begin().await?;

    let marker: Option<Option<String>> =
        sqlx::query_scalar("SELECT active_attendance FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(marker) = marker else {
        return Err(WorkflowError::UserNotFound);
    };
    if marker.is_some() {
        return Ok(ShiftOutcome::AlreadyStarted);
    }

    // The marker is authoritative, but double-check the ledger tail so the
    // one-open-period invariant survives a half-written day.
    let stored: Option<String> = sqlx::query_scalar("SELECT periods FROM attendance WHERE id = ?")
        .bind(&entry_id)
        .fetch_optional(&mut *tx)
        .await?;
    let mut periods: Vec<Period> = match stored {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Vec::new(),
    };
    if periods.last().is_some_and(|p| p.is_open()) {
        return Ok(ShiftOutcome::AlreadyStarted);
    }

    periods.push(Period {
        start_at: now,
        end_at: None,
        start_location: location,
        end_location: None,
    });

    let expires_at = now + Duration::days(LEDGER_TTL_DAYS);
    sqlx::query(
        r#"
        INSERT INTO attendance (id, company_id, user_id, date_key, periods, updated_at, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            periods = excluded.periods,
            updated_at = excluded.updated_at,
            expires_at = excluded.expires_at
        "#,
    )
    .bind(&entry_id)
    .bind(company_id)
    .bind(user_id)
    .bind(&date_key)
    .bind(serde_json::to_string(&periods)?)
    .bind(now)
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    let active = ActiveShift {
        company_id: company_id.to_string(),
        date_key,
        entry_id,
        started_at: now,
    };
    sqlx::query("UPDATE users SET active_attendance = ? WHERE id = ?")
        .bind(serde_json::to_string(&active)?)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    events.publish(ShiftEvent {
        user_id: user_id.to_string(),
        marker: Some(active),
    });
    Ok(ShiftOutcome::Started)
}

/// Closes the open shift at the current time.
pub async fn end_shift(
    pool: &SqlitePool,
    events: &ShiftEvents,
    user_id: &str,
    location: Option<GeoPoint>,
) -> Result<ShiftOutcome, WorkflowError> {
    finish_shift(pool, events, user_id, None, location).await
}

/// Closes the open shift at a caller-supplied time, clamped into
/// `[start_at, start_at + 13h]`. Used by the auto-end watchdog; also
/// notifies the user that the shift was closed for them.
pub async fn end_shift_at(
    pool: &SqlitePool,
    events: &ShiftEvents,
    user_id: &str,
    forced_end_at: DateTime<Utc>,
    location: Option<GeoPoint>,
) -> Result<ShiftOutcome, WorkflowError> {
    finish_shift(pool, events, user_id, Some(forced_end_at), location).await
}

async fn finish_shift(
    pool: &SqlitePool,
    events: &ShiftEvents,
    user_id: &str,
    forced_end_at: Option<DateTime<Utc>>,
    location: Option<GeoPoint>,
) -> Result<ShiftOutcome, WorkflowError> {
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let marker: Option<Option<String>> =
        sqlx::query_scalar("SELECT active_attendance FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(Some(raw_marker)) = marker else {
        return Ok(ShiftOutcome::NotStarted);
    };
    let active: ActiveShift = serde_json::from_str(&raw_marker)?;

    let row: Option<(String, String, String, String, String, DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as(
            r#"
            SELECT id, company_id, user_id, date_key, periods, updated_at, expires_at
            FROM attendance
            WHERE id = ?
            "#,
        )
        .bind(&active.entry_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some((id, company_id, owner_id, date_key, raw_periods, updated_at, old_expires)) = row
    else {
        return Ok(ShiftOutcome::NotStarted);
    };
    let mut entry = LedgerEntry {
        id,
        company_id,
        user_id: owner_id,
        date_key,
        periods: serde_json::from_str(&raw_periods)?,
        updated_at,
        expires_at: old_expires,
    };

    if !entry.has_open_period() {
        return Ok(ShiftOutcome::NotStarted);
    }
    let Some(last) = entry.periods.last_mut() else {
        return Ok(ShiftOutcome::NotStarted);
    };

    // end_at >= start_at always, by clamping rather than rejection.
    let end_at = match forced_end_at {
        Some(forced) => clamp_forced_end(last.start_at, forced),
        None => now.max(last.start_at),
    };
    last.end_at = Some(end_at);
    if location.is_some() {
        last.end_location = location;
    }

    entry.updated_at = now;
    entry.expires_at = now + Duration::days(LEDGER_TTL_DAYS);
    sqlx::query("UPDATE attendance SET periods = ?, updated_at = ?, expires_at = ? WHERE id = ?")
        .bind(serde_json::to_string(&entry.periods)?)
        .bind(entry.updated_at)
        .bind(entry.expires_at)
        .bind(&entry.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET active_attendance = NULL WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if forced_end_at.is_some() {
        notify::push_attendance_auto_ended(&mut tx, user_id, &entry.date_key, end_at).await?;
    }

    tx.commit().await?;

    events.publish(ShiftEvent {
        user_id: user_id.to_string(),
        marker: None,
    });
    Ok(ShiftOutcome::Ended)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use chrono_tz::Asia::Jerusalem;

    pub(crate) async fn seed_user(pool: &SqlitePool, user_id: &str, company_id: &str) {
        sqlx::query(
            r#"
            INSERT INTO users (id, company_id, full_name, role, created_at)
            VALUES (?, ?, 'Test User', 'employee', ?)
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    /// Plants an open shift that started at `started_at`, the same rows
    /// `start_shift` would have written.
    pub(crate) async fn plant_open_shift(
        pool: &SqlitePool,
        user_id: &str,
        company_id: &str,
        started_at: DateTime<Utc>,
    ) -> ActiveShift {
        let date_key = date_key_for(started_at, Jerusalem);
        let entry_id = LedgerEntry::entry_id(user_id, &date_key);
        let periods = vec![Period {
            start_at: started_at,
            end_at: None,
            start_location: None,
            end_location: None,
        }];
        sqlx::query(
            r#"
            INSERT INTO attendance (id, company_id, user_id, date_key, periods, updated_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry_id)
        .bind(company_id)
        .bind(user_id)
        .bind(&date_key)
        .bind(serde_json::to_string(&periods).unwrap())
        .bind(started_at)
        .bind(started_at + Duration::days(LEDGER_TTL_DAYS))
        .execute(pool)
        .await
        .unwrap();

        let marker = ActiveShift {
            company_id: company_id.to_string(),
            date_key,
            entry_id,
            started_at,
        };
        sqlx::query("UPDATE users SET active_attendance = ? WHERE id = ?")
            .bind(serde_json::to_string(&marker).unwrap())
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();
        marker
    }

    pub(crate) async fn marker_of(pool: &SqlitePool, user_id: &str) -> Option<ActiveShift> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT active_attendance FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_one(pool)
                .await
                .unwrap();
        raw.map(|r| serde_json::from_str(&r).unwrap())
    }

    pub(crate) async fn periods_of(pool: &SqlitePool, entry_id: &str) -> Vec<Period> {
        let raw: Option<String> = sqlx::query_scalar("SELECT periods FROM attendance WHERE id = ?")
            .bind(entry_id)
            .fetch_optional(pool)
            .await
            .unwrap();
        raw.map(|r| serde_json::from_str(&r).unwrap())
            .unwrap_or_default()
    }

    #[test]
    fn clamp_is_a_no_op_for_in_range_values() {
        let start = Utc::now();
        let in_range = start + Duration::hours(5);
        assert_eq!(clamp_forced_end(start, in_range), in_range);
    }

    #[test]
    fn clamp_bounds_both_ends() {
        let start = Utc::now();
        assert_eq!(clamp_forced_end(start, start - Duration::hours(1)), start);
        assert_eq!(
            clamp_forced_end(start, start + Duration::hours(20)),
            start + Duration::hours(MAX_SHIFT_HOURS)
        );
    }

    #[tokio::test]
    async fn start_then_end_closes_the_day() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(8);
        seed_user(&pool, "u1", "c1").await;

        let outcome = start_shift(&pool, &events, "u1", "c1", Jerusalem, None)
            .await
            .unwrap();
        assert_eq!(outcome, ShiftOutcome::Started);

        let marker = marker_of(&pool, "u1").await.expect("marker set");
        let periods = periods_of(&pool, &marker.entry_id).await;
        assert_eq!(periods.len(), 1);
        assert!(periods[0].is_open());

        let outcome = end_shift(&pool, &events, "u1", None).await.unwrap();
        assert_eq!(outcome, ShiftOutcome::Ended);
        assert!(marker_of(&pool, "u1").await.is_none());

        let periods = periods_of(&pool, &marker.entry_id).await;
        assert_eq!(periods.len(), 1);
        assert!(!periods[0].is_open());
        assert!(periods[0].end_at.unwrap() >= periods[0].start_at);
    }

    #[tokio::test]
    async fn double_start_is_an_idempotent_no_op() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(8);
        seed_user(&pool, "u1", "c1").await;

        start_shift(&pool, &events, "u1", "c1", Jerusalem, None)
            .await
            .unwrap();
        let marker = marker_of(&pool, "u1").await.unwrap();
        let before = periods_of(&pool, &marker.entry_id).await;

        let outcome = start_shift(&pool, &events, "u1", "c1", Jerusalem, None)
            .await
            .unwrap();
        assert_eq!(outcome, ShiftOutcome::AlreadyStarted);

        let after = periods_of(&pool, &marker.entry_id).await;
        assert_eq!(before.len(), after.len());
    }

    #[tokio::test]
    async fn end_without_open_shift_is_a_no_op() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(8);
        seed_user(&pool, "u1", "c1").await;

        let outcome = end_shift(&pool, &events, "u1", None).await.unwrap();
        assert_eq!(outcome, ShiftOutcome::NotStarted);
    }

    #[tokio::test]
    async fn repeated_start_end_cycles_keep_at_most_one_open_period() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(8);
        seed_user(&pool, "u1", "c1").await;

        for _ in 0..3 {
            start_shift(&pool, &events, "u1", "c1", Jerusalem, None)
                .await
                .unwrap();
            let marker = marker_of(&pool, "u1").await.unwrap();
            let periods = periods_of(&pool, &marker.entry_id).await;
            let open: Vec<_> = periods.iter().filter(|p| p.is_open()).collect();
            assert_eq!(open.len(), 1);
            assert!(periods.last().unwrap().is_open());

            end_shift(&pool, &events, "u1", None).await.unwrap();
            let periods = periods_of(&pool, &LedgerEntry::entry_id("u1", &marker.date_key)).await;
            assert!(periods.iter().all(|p| !p.is_open()));
        }
    }

    #[tokio::test]
    async fn forced_end_is_clamped_to_the_shift_cap() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(8);
        seed_user(&pool, "u1", "c1").await;

        let started_at = Utc::now() - Duration::hours(20);
        let marker = plant_open_shift(&pool, "u1", "c1", started_at).await;

        let outcome = end_shift_at(&pool, &events, "u1", Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(outcome, ShiftOutcome::Ended);

        let periods = periods_of(&pool, &marker.entry_id).await;
        assert_eq!(
            periods[0].end_at.unwrap(),
            started_at + Duration::hours(MAX_SHIFT_HOURS)
        );

        // the forced close also tells the user about it
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND kind = 'ATTENDANCE_AUTO_ENDED'",
        )
        .bind("u1")
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn forced_end_before_start_clamps_to_start() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(8);
        seed_user(&pool, "u1", "c1").await;

        let started_at = Utc::now() - Duration::hours(1);
        let marker = plant_open_shift(&pool, "u1", "c1", started_at).await;

        end_shift_at(&pool, &events, "u1", started_at - Duration::hours(2), None)
            .await
            .unwrap();

        let periods = periods_of(&pool, &marker.entry_id).await;
        assert_eq!(periods[0].end_at.unwrap(), started_at);
    }

    #[tokio::test]
    async fn shift_mutations_publish_marker_events() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(8);
        let mut rx = events.subscribe();
        seed_user(&pool, "u1", "c1").await;

        start_shift(&pool, &events, "u1", "c1", Jerusalem, None)
            .await
            .unwrap();
        end_shift(&pool, &events, "u1", None).await.unwrap();

        assert!(rx.recv().await.unwrap().marker.is_some());
        assert!(rx.recv().await.unwrap().marker.is_none());
    }
}
