//! Outbox publisher configuration.

use serde::{Deserialize, Serialize};

/// Outbox publisher tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Interval in seconds between outbox polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum rows fetched per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Publish attempts before an event is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2
}

fn default_batch_size() -> i64 {
    50
}

fn default_max_attempts() -> i32 {
    5
}
