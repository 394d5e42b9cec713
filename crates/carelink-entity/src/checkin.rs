//! Check-in model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A daily wellbeing check-in. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckIn {
    /// Row identifier.
    pub id: Uuid,
    /// The user who checked in.
    pub user_id: Uuid,
    /// Self-reported mood.
    pub mood: String,
    /// When the check-in happened.
    pub created_at: DateTime<Utc>,
}
