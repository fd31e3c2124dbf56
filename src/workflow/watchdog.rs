use chrono::{Duration, Utc};
use futures_util::StreamExt;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::model::attendance::ActiveShift;
use crate::workflow::events::{ShiftEvent, ShiftEvents};
use crate::workflow::shift::{self, MAX_SHIFT_HOURS};

/// Observes shift events and force-ends any shift open for more than 13
/// hours. Best-effort and process-local, like the client it replaces: with
/// no process running, an overdue shift stays open until one re-attaches —
/// hence the sweep of already-open markers at startup.
pub fn spawn(pool: SqlitePool, events: ShiftEvents) {
    let in_flight: Arc<Mutex<HashSet<String>>> = Arc::default();
    let mut rx = events.subscribe();

    tokio::spawn(async move {
        if let Err(e) = sweep_open_shifts(&pool, &events, &in_flight).await {
            warn!(error = %e, "Overdue-shift sweep failed");
        }

        loop {
            match rx.recv().await {
                Ok(event) => handle_event(&pool, &events, &in_flight, event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Shift event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Re-checks every marker that was already set when this process started.
async fn sweep_open_shifts(
    pool: &SqlitePool,
    events: &ShiftEvents,
    in_flight: &Arc<Mutex<HashSet<String>>>,
) -> anyhow::Result<()> {
    let mut rows = sqlx::query_as::<_, (String, String)>(
        "SELECT id, active_attendance FROM users WHERE active_attendance IS NOT NULL",
    )
    .fetch(pool);

    while let Some(row) = rows.next().await {
        let (user_id, raw) = row?;
        let Ok(marker) = serde_json::from_str::<ActiveShift>(&raw) else {
            continue;
        };
        handle_event(
            pool,
            events,
            in_flight,
            ShiftEvent {
                user_id,
                marker: Some(marker),
            },
        );
    }
    Ok(())
}

fn handle_event(
    pool: &SqlitePool,
    events: &ShiftEvents,
    in_flight: &Arc<Mutex<HashSet<String>>>,
    event: ShiftEvent,
) {
    let Some(marker) = event.marker else {
        return;
    };
    if Utc::now() - marker.started_at <= Duration::hours(MAX_SHIFT_HOURS) {
        return;
    }

    // single-flight per user: a burst of events during the forced end must
    // not trigger a second concurrent force-end
    if !in_flight.lock().unwrap().insert(event.user_id.clone()) {
        return;
    }

    let pool = pool.clone();
    let events = events.clone();
    let in_flight = Arc::clone(in_flight);
    tokio::spawn(async move {
        match shift::end_shift_at(&pool, &events, &event.user_id, Utc::now(), None).await {
            Ok(outcome) => info!(user_id = %event.user_id, ?outcome, "Force-ended overdue shift"),
            Err(e) => error!(error = %e, user_id = %event.user_id, "Failed to force-end overdue shift"),
        }
        in_flight.lock().unwrap().remove(&event.user_id);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use crate::workflow::shift::tests::{marker_of, periods_of, plant_open_shift, seed_user};
    use std::time::Duration as StdDuration;

    async fn wait_for_marker_clear(pool: &SqlitePool, user_id: &str) -> bool {
        for _ in 0..100 {
            if marker_of(pool, user_id).await.is_none() {
                return true;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn overdue_shift_is_force_ended_with_a_clamped_end() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(16);
        seed_user(&pool, "u1", "c1").await;

        let started_at = Utc::now() - Duration::hours(20);
        let marker = plant_open_shift(&pool, "u1", "c1", started_at).await;

        spawn(pool.clone(), events.clone());
        events.publish(ShiftEvent {
            user_id: "u1".into(),
            marker: Some(marker.clone()),
        });

        assert!(wait_for_marker_clear(&pool, "u1").await, "watchdog never closed the shift");

        let periods = periods_of(&pool, &marker.entry_id).await;
        assert_eq!(
            periods[0].end_at.unwrap(),
            started_at + Duration::hours(MAX_SHIFT_HOURS)
        );
    }

    #[tokio::test]
    async fn startup_sweep_catches_markers_set_before_attach() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(16);
        seed_user(&pool, "u1", "c1").await;
        plant_open_shift(&pool, "u1", "c1", Utc::now() - Duration::hours(14)).await;

        // no event published: the sweep alone must find it
        spawn(pool.clone(), events.clone());

        assert!(wait_for_marker_clear(&pool, "u1").await, "sweep never closed the shift");
    }

    #[tokio::test]
    async fn fresh_shifts_are_left_alone() {
        let pool = init_memory_db().await;
        let events = ShiftEvents::new(16);
        seed_user(&pool, "u1", "c1").await;
        let marker = plant_open_shift(&pool, "u1", "c1", Utc::now() - Duration::hours(2)).await;

        spawn(pool.clone(), events.clone());
        events.publish(ShiftEvent {
            user_id: "u1".into(),
            marker: Some(marker),
        });
        tokio::time::sleep(StdDuration::from_millis(100)).await;

        assert!(marker_of(&pool, "u1").await.is_some());
    }
}
