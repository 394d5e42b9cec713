//! Push delivery report value types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a delivery attempt to one device token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOutcome {
    /// Delivered through the primary protocol.
    Delivered,
    /// Primary reported unregistered; the fallback protocol delivered.
    DeliveredViaFallback,
    /// Transient failure; the token remains valid.
    Failed,
    /// Permanently invalid; the token was revoked.
    Revoked,
}

/// Per-token delivery result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDelivery {
    /// Token row ID.
    pub token_id: Uuid,
    /// Delivery outcome.
    pub outcome: TokenOutcome,
    /// Gateway error detail for failed attempts.
    pub error: Option<String>,
}

/// Result of delivering one event to all of a user's devices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// The event that was delivered.
    pub event_id: Option<Uuid>,
    /// Per-token outcomes, in resolution order.
    pub tokens: Vec<TokenDelivery>,
}

impl DeliveryReport {
    /// Number of tokens that received the notification on any protocol.
    pub fn delivered_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| {
                matches!(
                    t.outcome,
                    TokenOutcome::Delivered | TokenOutcome::DeliveredViaFallback
                )
            })
            .count()
    }

    /// Whether no tokens were resolved for the target user.
    pub fn is_noop(&self) -> bool {
        self.tokens.is_empty()
    }
}
