//! Outbox event row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A durably queued event awaiting (or past) broker publication.
///
/// Rows are created by producers, mutated only by the outbox publisher,
/// and never deleted; the table doubles as the pipeline's audit log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Event type discriminator.
    pub event_type: String,
    /// Full event envelope as stored JSON.
    pub payload: serde_json::Value,
    /// Whether the event reached the broker (or was dead-lettered).
    pub published: bool,
    /// Publish attempts made so far.
    pub attempts: i32,
    /// Last publish error, if any.
    pub last_error: Option<String>,
    /// Earliest time the next publish attempt may run.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// When the row was appended.
    pub created_at: DateTime<Utc>,
    /// When the event was successfully published.
    pub published_at: Option<DateTime<Utc>>,
}

/// Reference to a durably queued event, returned to producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    /// Outbox row ID.
    pub id: Uuid,
}

impl From<&OutboxEvent> for EventRef {
    fn from(event: &OutboxEvent) -> Self {
        Self { id: event.id }
    }
}
