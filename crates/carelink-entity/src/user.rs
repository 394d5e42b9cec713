//! Local user projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Monitored user as projected into the pipeline's store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// User identifier.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Most recent check-in time.
    pub last_check_in_at: Option<DateTime<Utc>>,
    /// Throttle anchor: when a missed-check-in reminder was last issued.
    pub last_reminder_at: Option<DateTime<Utc>>,
}
