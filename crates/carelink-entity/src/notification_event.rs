//! Received-event audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An event as received from the pub/sub bus, persisted for audit and
/// dashboard history. Immutable after insertion except for `read_by`
/// appends.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationEvent {
    /// Row identifier.
    pub id: Uuid,
    /// The originating event's ID (derived message ID for legacy events).
    pub event_id: String,
    /// Event type discriminator.
    pub event_type: String,
    /// Full decoded payload.
    pub payload: serde_json::Value,
    /// Topic the message arrived on.
    pub source_topic: String,
    /// When the consumer received the message.
    pub received_at: DateTime<Utc>,
    /// Users who have marked this event as read.
    pub read_by: Vec<Uuid>,
}
