//! Deduplication marker model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A claimed message ID. The primary-key constraint on `message_id` is
/// the deduplication mechanism: the first inserter wins, everyone else
/// observes the conflict and skips.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcessedMessage {
    /// Deterministically derived message identifier.
    pub message_id: String,
    /// When the message was first claimed.
    pub processed_at: DateTime<Utc>,
}
