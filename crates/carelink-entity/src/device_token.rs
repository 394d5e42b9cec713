//! Device token model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A mobile push token registered for a user.
///
/// Tokens are never physically deleted; permanently invalid ones are
/// flagged `revoked` and retained for auditability.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceToken {
    /// Row identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// The gateway token string.
    pub token: String,
    /// Device platform (`"android"`, `"ios"`, `"web"`).
    pub platform: String,
    /// When the token was first registered.
    pub created_at: DateTime<Utc>,
    /// Last time a delivery to this token was attempted.
    pub last_seen_at: DateTime<Utc>,
    /// Whether the gateway confirmed the token permanently invalid.
    pub revoked: bool,
}
