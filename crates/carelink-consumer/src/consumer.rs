//! Bus consumer loop and per-message routing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use carelink_bus::{BusMessage, EventBus, EventHub};
use carelink_core::events::{topics, DeliveryTarget, EventEnvelope, EVENT_BADGE_AWARDED,
    EVENT_BADGE_NOTIFICATION};
use carelink_core::metrics::PipelineCounters;
use carelink_database::repositories::notification_event::NotificationEventRepository;
use carelink_database::repositories::processed_message::ProcessedMessageRepository;
use carelink_outbox::OutboxService;
use carelink_push::PushService;

/// Delay before re-opening a dropped bus subscription.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Consumes the pipeline's pub/sub topics.
///
/// Safe to run in multiple process replicas against the same store: the
/// dedup gate's atomic claim decides which replica acts on a message.
pub struct BusConsumer {
    bus: Arc<dyn EventBus>,
    dedup: Arc<ProcessedMessageRepository>,
    audit: Arc<NotificationEventRepository>,
    outbox: OutboxService,
    push: Arc<PushService>,
    hub: EventHub,
    counters: Arc<PipelineCounters>,
}

impl std::fmt::Debug for BusConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusConsumer").finish()
    }
}

impl BusConsumer {
    /// Create a new bus consumer.
    pub fn new(
        bus: Arc<dyn EventBus>,
        dedup: Arc<ProcessedMessageRepository>,
        audit: Arc<NotificationEventRepository>,
        outbox: OutboxService,
        push: Arc<PushService>,
        hub: EventHub,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        Self {
            bus,
            dedup,
            audit,
            outbox,
            push,
            hub,
            counters,
        }
    }

    /// Run until the cancel signal is received, re-subscribing whenever
    /// the backend drops the subscription.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(topics = ?topics::CONSUMER_SUBSCRIPTIONS, "Bus consumer started");

        'outer: loop {
            let mut subscription = match self.bus.subscribe(topics::CONSUMER_SUBSCRIPTIONS).await {
                Ok(sub) => sub,
                Err(e) => {
                    error!("Bus subscribe failed, retrying: {e}");
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() { break 'outer; }
                        }
                        _ = time::sleep(RESUBSCRIBE_DELAY) => {}
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = cancel.changed() => {
                        if *cancel.borrow() {
                            info!("Bus consumer received shutdown signal");
                            break 'outer;
                        }
                    }
                    msg = subscription.recv() => match msg {
                        Some(msg) => self.handle_message(&msg).await,
                        None => {
                            warn!("Bus subscription ended, re-subscribing");
                            time::sleep(RESUBSCRIBE_DELAY).await;
                            break;
                        }
                    }
                }
            }
        }

        info!("Bus consumer shut down");
    }

    /// Process one inbound message.
    pub async fn handle_message(&self, msg: &BusMessage) {
        self.counters.incr_consumed();

        let Some(envelope) = crate::decode::decode_event(&msg.payload) else {
            // Malformed messages are not retried; they cannot become
            // valid by retrying.
            self.counters.incr_malformed();
            warn!(topic = %msg.topic, "Dropping undecodable bus message");
            return;
        };

        let message_id = envelope.message_id();
        match self.dedup.claim(&message_id).await {
            Ok(true) => {}
            Ok(false) => {
                self.counters.incr_deduplicated();
                debug!(%message_id, "Duplicate delivery, skipping");
                return;
            }
            Err(e) => {
                // Leave the message unclaimed; the broker's at-least-once
                // redelivery gives it another chance.
                error!(%message_id, "Dedup claim failed: {e}");
                return;
            }
        }

        debug!(
            %message_id,
            event_type = %envelope.event_type,
            topic = %msg.topic,
            "Processing event"
        );

        self.translate(&envelope).await;

        if let Err(e) = self
            .audit
            .insert(
                &message_id,
                &envelope.event_type,
                &envelope.payload,
                &msg.topic,
            )
            .await
        {
            error!(%message_id, "Failed to persist audit record: {e}");
        }

        self.hub.emit(envelope.clone());

        if envelope.targets_mobile() {
            if let Err(e) = self.push.deliver(&envelope).await {
                error!(%message_id, "Push delivery failed: {e}");
            }
        }
    }

    /// Type-specific translation of inbound events.
    async fn translate(&self, envelope: &EventEnvelope) {
        if envelope.event_type == EVENT_BADGE_AWARDED {
            // Badge awards come from the gamification service; turn them
            // into user-facing notifications through the same outbox.
            let result = self
                .outbox
                .enqueue_event(
                    EVENT_BADGE_NOTIFICATION,
                    envelope.user_id,
                    vec![DeliveryTarget::Dashboard, DeliveryTarget::Mobile],
                    envelope.payload.clone(),
                )
                .await;
            match result {
                Ok(event_ref) => {
                    debug!(event_id = %event_ref.id, "Badge award translated to notification")
                }
                Err(e) => error!("Failed to enqueue badge notification: {e}"),
            }
        }
    }
}
