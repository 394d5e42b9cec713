//! Synchronous outbox append API.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use carelink_core::events::{DeliveryTarget, EventEnvelope};
use carelink_core::metrics::PipelineCounters;
use carelink_core::result::AppResult;
use carelink_database::repositories::outbox::OutboxRepository;
use carelink_entity::outbox::EventRef;

/// Producer-facing entry point of the pipeline.
///
/// `enqueue` returns as soon as the row is durable; everything
/// downstream (broker publish, fan-out, push) is eventual and invisible
/// to the caller.
#[derive(Debug, Clone)]
pub struct OutboxService {
    repo: Arc<OutboxRepository>,
    counters: Arc<PipelineCounters>,
}

impl OutboxService {
    /// Create a new outbox service.
    pub fn new(repo: Arc<OutboxRepository>, counters: Arc<PipelineCounters>) -> Self {
        Self { repo, counters }
    }

    /// Durably append an event envelope.
    pub async fn enqueue(&self, envelope: &EventEnvelope) -> AppResult<EventRef> {
        let payload = serde_json::to_value(envelope)?;
        let row = self
            .repo
            .insert(envelope.id, &envelope.event_type, &payload)
            .await?;

        self.counters.incr_enqueued();
        debug!(
            event_id = %row.id,
            event_type = %row.event_type,
            "Event durably queued"
        );
        Ok(EventRef::from(&row))
    }

    /// Build and enqueue an envelope in one step.
    pub async fn enqueue_event(
        &self,
        event_type: &str,
        user_id: Option<Uuid>,
        target: Vec<DeliveryTarget>,
        payload: serde_json::Value,
    ) -> AppResult<EventRef> {
        let envelope = EventEnvelope::new(event_type, user_id, target, payload);
        self.enqueue(&envelope).await
    }
}
