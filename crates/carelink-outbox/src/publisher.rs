//! Outbox publisher — the background loop moving durable rows onto the
//! broker.
//!
//! The retry engine is the row itself: `next_attempt_at` is a
//! scheduled-visibility timestamp, so retry state survives process
//! restarts. The loop only ever looks at due rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use carelink_core::config::outbox::OutboxConfig;
use carelink_core::events::topics;
use carelink_core::metrics::PipelineCounters;
use carelink_database::repositories::outbox::OutboxRepository;
use carelink_entity::outbox::OutboxEvent;

use carelink_bus::{EventBus, StreamProducer};

/// Seconds a claimed row stays invisible to other publisher replicas.
/// A crashed publisher's claims lapse back to due after this.
const CLAIM_LEASE_SECONDS: i64 = 30;

/// Linear backoff base per failed attempt.
const BACKOFF_STEP: Duration = Duration::from_secs(60);

/// Backoff ceiling.
const BACKOFF_CAP: Duration = Duration::from_secs(15 * 60);

/// Delay before the next attempt after `attempts` consecutive failures.
///
/// Linear in the attempt count, capped at 15 minutes.
pub fn backoff_delay(attempts: i32) -> Duration {
    let attempts = attempts.max(1) as u32;
    (BACKOFF_STEP * attempts).min(BACKOFF_CAP)
}

/// Polls the outbox and publishes due rows to the log-structured broker,
/// mirroring each onto the pub/sub fan-out topic.
pub struct OutboxPublisher {
    repo: Arc<OutboxRepository>,
    stream: Arc<dyn StreamProducer>,
    bus: Arc<dyn EventBus>,
    config: OutboxConfig,
    counters: Arc<PipelineCounters>,
}

impl std::fmt::Debug for OutboxPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxPublisher")
            .field("config", &self.config)
            .finish()
    }
}

impl OutboxPublisher {
    /// Create a new publisher.
    pub fn new(
        repo: Arc<OutboxRepository>,
        stream: Arc<dyn StreamProducer>,
        bus: Arc<dyn EventBus>,
        config: OutboxConfig,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        Self {
            repo,
            stream,
            bus,
            config,
            counters,
        }
    }

    /// Run until the cancel signal is received.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            poll_interval = self.config.poll_interval_seconds,
            batch_size = self.config.batch_size,
            max_attempts = self.config.max_attempts,
            "Outbox publisher started"
        );

        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Outbox publisher received shutdown signal");
                        break;
                    }
                }
                _ = time::sleep(poll_interval) => {
                    self.poll_once().await;
                }
            }
        }

        info!("Outbox publisher shut down");
    }

    /// One poll cycle: claim due rows and publish each.
    pub async fn poll_once(&self) {
        let rows = match self
            .repo
            .claim_due(self.config.batch_size, CLAIM_LEASE_SECONDS)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to claim outbox rows: {e}");
                return;
            }
        };

        if rows.is_empty() {
            return;
        }
        debug!(count = rows.len(), "Publishing claimed outbox rows");

        for row in rows {
            self.publish_row(&row).await;
        }
    }

    /// Publish one row, updating its retry state on failure.
    async fn publish_row(&self, row: &OutboxEvent) {
        let payload = row.payload.to_string();

        match self.publish_to_brokers(&payload).await {
            Ok(()) => {
                if let Err(e) = self.repo.mark_published(row.id).await {
                    // The publish landed; the row will be retried and the
                    // duplicate collapsed by the consumer's dedup gate.
                    error!(event_id = %row.id, "Failed to mark row published: {e}");
                    return;
                }
                self.counters.incr_published();
                debug!(event_id = %row.id, event_type = %row.event_type, "Event published");
            }
            Err(e) => {
                self.counters.incr_publish_failures();
                let attempts_now = row.attempts + 1;
                if attempts_now >= self.config.max_attempts {
                    warn!(
                        event_id = %row.id,
                        attempts = attempts_now,
                        "Event exhausted publish attempts: {e}"
                    );
                    self.dead_letter(row, &e).await;
                } else {
                    let delay = backoff_delay(attempts_now);
                    let next = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
                    warn!(
                        event_id = %row.id,
                        attempts = attempts_now,
                        retry_in_secs = delay.as_secs(),
                        "Publish failed, scheduling retry: {e}"
                    );
                    if let Err(e) = self.repo.record_failure(row.id, &e, next).await {
                        error!(event_id = %row.id, "Failed to record publish failure: {e}");
                    }
                }
            }
        }
    }

    /// Append to the log-structured topic, then mirror onto the pub/sub
    /// fan-out topic. Both must land for the row to count as published;
    /// a duplicate append on retry is collapsed downstream.
    async fn publish_to_brokers(&self, payload: &str) -> Result<(), String> {
        self.stream
            .append(topics::STREAM_NOTIFICATION_EVENTS, payload)
            .await
            .map_err(|e| e.to_string())?;
        self.bus
            .publish(topics::NOTIFICATION_EVENTS, payload)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Route a poison row to the dead-letter topic, then mark it
    /// terminal so it can never block the queue. If the dead-letter
    /// append itself fails, the row stays live and the whole step reruns
    /// on a later poll.
    async fn dead_letter(&self, row: &OutboxEvent, error: &str) {
        let payload = serde_json::json!({
            "type": "outbox.dlq",
            "original": row,
        })
        .to_string();

        if let Err(e) = self
            .stream
            .append(topics::STREAM_NOTIFICATION_DLQ, &payload)
            .await
        {
            error!(event_id = %row.id, "Dead-letter append failed, will retry: {e}");
            let next = Utc::now() + chrono::Duration::seconds(backoff_delay(row.attempts + 1).as_secs() as i64);
            if let Err(e) = self.repo.record_failure(row.id, error, next).await {
                error!(event_id = %row.id, "Failed to record failure after DLQ miss: {e}");
            }
            return;
        }

        if let Err(e) = self.repo.mark_terminal(row.id, error).await {
            error!(event_id = %row.id, "Failed to mark row terminal: {e}");
            return;
        }
        self.counters.incr_dead_lettered();
        warn!(event_id = %row.id, event_type = %row.event_type, "Event dead-lettered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear_below_the_cap() {
        assert_eq!(backoff_delay(1), Duration::from_secs(60));
        assert_eq!(backoff_delay(2), Duration::from_secs(120));
        assert_eq!(backoff_delay(5), Duration::from_secs(300));
    }

    #[test]
    fn backoff_caps_at_fifteen_minutes() {
        assert_eq!(backoff_delay(15), Duration::from_secs(900));
        assert_eq!(backoff_delay(16), Duration::from_secs(900));
        assert_eq!(backoff_delay(i32::MAX), Duration::from_secs(900));
    }

    #[test]
    fn backoff_is_monotonic_in_attempt_count() {
        let mut last = Duration::ZERO;
        for attempts in 1..=30 {
            let delay = backoff_delay(attempts);
            assert!(delay >= last, "backoff decreased at attempt {attempts}");
            last = delay;
        }
    }

    #[test]
    fn zero_or_negative_attempts_clamp_to_one_step() {
        assert_eq!(backoff_delay(0), Duration::from_secs(60));
        assert_eq!(backoff_delay(-3), Duration::from_secs(60));
    }
}
