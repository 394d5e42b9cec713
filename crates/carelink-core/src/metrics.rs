//! Internal pipeline counters.
//!
//! Failures past the outbox durability boundary are logged, never
//! escalated to producers; these counters keep them operator-visible
//! through the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic counters shared by the pipeline components.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    /// Events durably appended to the outbox.
    enqueued: AtomicU64,
    /// Events successfully published to the log-structured broker.
    published: AtomicU64,
    /// Publish attempts that failed and were scheduled for retry.
    publish_failures: AtomicU64,
    /// Events routed to the dead-letter topic.
    dead_lettered: AtomicU64,
    /// Messages consumed from the pub/sub bus.
    consumed: AtomicU64,
    /// Messages dropped as duplicates by the dedup gate.
    deduplicated: AtomicU64,
    /// Messages dropped as undecodable.
    malformed: AtomicU64,
    /// Push sends that reached a device.
    pushes_delivered: AtomicU64,
    /// Push sends that failed after all configured protocols.
    pushes_failed: AtomicU64,
    /// Device tokens revoked as permanently invalid.
    tokens_revoked: AtomicU64,
}

/// Point-in-time snapshot of [`PipelineCounters`] for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub enqueued: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub dead_lettered: u64,
    pub consumed: u64,
    pub deduplicated: u64,
    pub malformed: u64,
    pub pushes_delivered: u64,
    pub pushes_failed: u64,
    pub tokens_revoked: u64,
}

impl PipelineCounters {
    /// Create a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_publish_failures(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_pushes_delivered(&self) {
        self.pushes_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_pushes_failed(&self) {
        self.pushes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_tokens_revoked(&self) {
        self.tokens_revoked.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot for reporting.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            pushes_delivered: self.pushes_delivered.load(Ordering::Relaxed),
            pushes_failed: self.pushes_failed.load(Ordering::Relaxed),
            tokens_revoked: self.tokens_revoked.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let counters = PipelineCounters::new();
        counters.incr_enqueued();
        counters.incr_enqueued();
        counters.incr_dead_lettered();

        let snap = counters.snapshot();
        assert_eq!(snap.enqueued, 2);
        assert_eq!(snap.dead_lettered, 1);
        assert_eq!(snap.published, 0);
    }
}
