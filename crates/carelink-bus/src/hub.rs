//! In-process event hub.
//!
//! Consumed events are re-broadcast here so same-process listeners (the
//! dashboard SSE stream) can react without another network round trip.

use tokio::sync::broadcast;

use carelink_core::events::EventEnvelope;

/// Broadcast fan-out of decoded events to in-process listeners.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventHub {
    /// Create a hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current listeners. Lagging or absent
    /// listeners are not an error.
    pub fn emit(&self, event: EventEnvelope) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the live event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::events::{DeliveryTarget, EVENT_CHECKIN};
    use uuid::Uuid;

    #[tokio::test]
    async fn emitted_events_reach_subscribers() {
        let hub = EventHub::new(16);
        let mut rx = hub.subscribe();

        let event = EventEnvelope::new(
            EVENT_CHECKIN,
            Some(Uuid::new_v4()),
            vec![DeliveryTarget::Dashboard],
            serde_json::json!({"mood": "good"}),
        );
        hub.emit(event.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
        assert_eq!(received.event_type, EVENT_CHECKIN);
    }

    #[test]
    fn emit_without_listeners_is_a_noop() {
        let hub = EventHub::new(4);
        hub.emit(EventEnvelope::new(
            EVENT_CHECKIN,
            None,
            vec![],
            serde_json::json!({}),
        ));
        assert_eq!(hub.listener_count(), 0);
    }
}
