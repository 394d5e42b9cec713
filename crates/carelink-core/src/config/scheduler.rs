//! Missed-check-in scheduler configuration.

use serde::{Deserialize, Serialize};

/// Missed-check-in sweep tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the sweep is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in seconds between sweeps.
    #[serde(default = "default_sweep_period")]
    pub sweep_period_seconds: u64,
    /// Hours after local midnight before a missing check-in counts as missed.
    #[serde(default = "default_grace_window")]
    pub grace_window_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_period_seconds: default_sweep_period(),
            grace_window_hours: default_grace_window(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_period() -> u64 {
    60
}

fn default_grace_window() -> i64 {
    3
}
