use tokio::sync::broadcast;

use crate::model::attendance::ActiveShift;

/// Latest marker state for one user, published after every committed shift
/// mutation. `marker == None` means the shift was closed.
#[derive(Debug, Clone)]
pub struct ShiftEvent {
    pub user_id: String,
    pub marker: Option<ActiveShift>,
}

/// In-process stand-in for the document store's snapshot listeners:
/// at-least-once delivery of the latest state to every subscriber.
#[derive(Clone)]
pub struct ShiftEvents {
    tx: broadcast::Sender<ShiftEvent>,
}

impl ShiftEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Lossy by design: publishing with no subscribers is not an error.
    pub fn publish(&self, event: ShiftEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShiftEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn subscribers_see_the_latest_marker_state() {
        let events = ShiftEvents::new(8);
        let mut rx = events.subscribe();

        events.publish(ShiftEvent {
            user_id: "u1".into(),
            marker: Some(ActiveShift {
                company_id: "c1".into(),
                date_key: "2026-02-10".into(),
                entry_id: "u1_2026-02-10".into(),
                started_at: Utc::now(),
            }),
        });
        events.publish(ShiftEvent { user_id: "u1".into(), marker: None });

        let first = rx.recv().await.unwrap();
        assert!(first.marker.is_some());
        let second = rx.recv().await.unwrap();
        assert!(second.marker.is_none());
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let events = ShiftEvents::new(8);
        events.publish(ShiftEvent { user_id: "u1".into(), marker: None });
    }
}
