//! Push delivery orchestration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use carelink_core::config::push::PushConfig;
use carelink_core::events::EventEnvelope;
use carelink_core::metrics::PipelineCounters;
use carelink_core::result::AppResult;
use carelink_entity::delivery::{DeliveryReport, TokenDelivery, TokenOutcome};
use carelink_entity::device_token::DeviceToken;

use crate::formatter::PushFormatter;
use crate::gateway::{GatewayError, PushGateway, PushMessage};
use crate::store::TokenStore;

/// Delivers mobile-targeted events to all of a user's devices.
#[derive(Debug)]
pub struct PushService {
    tokens: Arc<dyn TokenStore>,
    gateway: Arc<dyn PushGateway>,
    config: PushConfig,
    counters: Arc<PipelineCounters>,
}

impl PushService {
    /// Create a new push service.
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        gateway: Arc<dyn PushGateway>,
        config: PushConfig,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        Self {
            tokens,
            gateway,
            config,
            counters,
        }
    }

    /// Deliver an event to every active device of its target user.
    ///
    /// Zero resolved tokens is a no-op, not an error. Per-token failures
    /// are isolated; the report carries each token's outcome.
    pub async fn deliver(&self, event: &EventEnvelope) -> AppResult<DeliveryReport> {
        let mut report = DeliveryReport {
            event_id: Some(event.id),
            tokens: Vec::new(),
        };

        if !self.config.enabled || !event.targets_mobile() {
            return Ok(report);
        }

        let Some(user_id) = event.user_id else {
            debug!(event_id = %event.id, "Mobile-targeted event has no user, skipping push");
            return Ok(report);
        };

        let tokens = self.tokens.active_tokens(user_id).await?;
        if tokens.is_empty() {
            debug!(%user_id, "No active device tokens, nothing to push");
            return Ok(report);
        }

        let message = build_message(event)?;

        for token in &tokens {
            let delivery = self.deliver_to_token(token, &message).await;
            report.tokens.push(delivery);
        }

        info!(
            event_id = %event.id,
            delivered = report.delivered_count(),
            attempted = report.tokens.len(),
            "Push delivery finished"
        );
        Ok(report)
    }

    /// Deliver to one token, applying the propagation delay, the
    /// fallback protocol, and the revocation rule.
    async fn deliver_to_token(&self, token: &DeviceToken, message: &PushMessage) -> TokenDelivery {
        if self.config.propagation_delay_ms > 0 {
            // Freshly-registered tokens may not have propagated to the
            // gateway yet.
            tokio::time::sleep(Duration::from_millis(self.config.propagation_delay_ms)).await;
        }

        let outcome = match self.gateway.send_primary(&token.token, message).await {
            Ok(()) => {
                self.counters.incr_pushes_delivered();
                TokenDelivery {
                    token_id: token.id,
                    outcome: TokenOutcome::Delivered,
                    error: None,
                }
            }
            Err(GatewayError::Unregistered) => self.handle_unregistered(token, message).await,
            Err(GatewayError::Request(e)) => {
                self.counters.incr_pushes_failed();
                warn!(token_id = %token.id, "Push failed (transient): {e}");
                TokenDelivery {
                    token_id: token.id,
                    outcome: TokenOutcome::Failed,
                    error: Some(e),
                }
            }
        };

        // Every attempted token gets a last_seen_at update for auditing,
        // successful or not.
        if let Err(e) = self.tokens.touch(token.id).await {
            warn!(token_id = %token.id, "Failed to update token last_seen_at: {e}");
        }

        outcome
    }

    /// The primary protocol said unregistered. Try the fallback if
    /// enabled; revoke only when no protocol still accepts the token.
    async fn handle_unregistered(
        &self,
        token: &DeviceToken,
        message: &PushMessage,
    ) -> TokenDelivery {
        if self.config.fallback_enabled {
            match self.gateway.send_fallback(&token.token, message).await {
                Ok(()) => {
                    self.counters.incr_pushes_delivered();
                    debug!(token_id = %token.id, "Fallback protocol accepted the token");
                    return TokenDelivery {
                        token_id: token.id,
                        outcome: TokenOutcome::DeliveredViaFallback,
                        error: None,
                    };
                }
                Err(e) => {
                    debug!(token_id = %token.id, "Fallback also failed: {e}");
                }
            }
        }

        self.revoke_token(token).await
    }

    async fn revoke_token(&self, token: &DeviceToken) -> TokenDelivery {
        match self.tokens.revoke(token.id).await {
            Ok(()) => {
                self.counters.incr_tokens_revoked();
                info!(token_id = %token.id, user_id = %token.user_id, "Device token revoked");
                TokenDelivery {
                    token_id: token.id,
                    outcome: TokenOutcome::Revoked,
                    error: Some("token unregistered".to_string()),
                }
            }
            Err(e) => {
                warn!(token_id = %token.id, "Failed to revoke token: {e}");
                self.counters.incr_pushes_failed();
                TokenDelivery {
                    token_id: token.id,
                    outcome: TokenOutcome::Failed,
                    error: Some(format!("revocation failed: {e}")),
                }
            }
        }
    }
}

/// Build the wire message for an event: formatted notification plus the
/// full envelope as the opaque data payload.
fn build_message(event: &EventEnvelope) -> AppResult<PushMessage> {
    let (title, body) = PushFormatter::format(event);
    let data_payload = serde_json::to_string(event)?;
    Ok(PushMessage {
        title,
        body,
        data_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use carelink_core::events::{DeliveryTarget, EVENT_MISSED_CHECKIN_ALERT};
    use carelink_core::result::AppResult;

    /// In-memory token store recording touches and revocations.
    #[derive(Debug, Default)]
    struct FakeTokenStore {
        tokens: Mutex<Vec<DeviceToken>>,
        touched: Mutex<Vec<Uuid>>,
        revoked: Mutex<Vec<Uuid>>,
    }

    impl FakeTokenStore {
        fn with_tokens(tokens: Vec<DeviceToken>) -> Self {
            Self {
                tokens: Mutex::new(tokens),
                ..Default::default()
            }
        }

        fn revoked_ids(&self) -> Vec<Uuid> {
            self.revoked.lock().unwrap().clone()
        }

        fn touched_ids(&self) -> Vec<Uuid> {
            self.touched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenStore for FakeTokenStore {
        async fn active_tokens(&self, user_id: Uuid) -> AppResult<Vec<DeviceToken>> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == user_id && !t.revoked)
                .cloned()
                .collect())
        }

        async fn touch(&self, id: Uuid) -> AppResult<()> {
            self.touched.lock().unwrap().push(id);
            Ok(())
        }

        async fn revoke(&self, id: Uuid) -> AppResult<()> {
            self.revoked.lock().unwrap().push(id);
            Ok(())
        }
    }

    /// Scripted gateway: per-token primary/fallback behavior.
    #[derive(Debug, Default)]
    struct ScriptedGateway {
        /// token string → unregistered on primary?
        unregistered: HashMap<String, bool>,
        /// token string → fallback accepts?
        fallback_accepts: HashMap<String, bool>,
        primary_sends: Mutex<Vec<String>>,
        fallback_sends: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushGateway for ScriptedGateway {
        async fn send_primary(
            &self,
            token: &str,
            _message: &PushMessage,
        ) -> Result<(), GatewayError> {
            self.primary_sends.lock().unwrap().push(token.to_string());
            if self.unregistered.get(token).copied().unwrap_or(false) {
                Err(GatewayError::Unregistered)
            } else {
                Ok(())
            }
        }

        async fn send_fallback(
            &self,
            token: &str,
            _message: &PushMessage,
        ) -> Result<(), GatewayError> {
            self.fallback_sends.lock().unwrap().push(token.to_string());
            if self.fallback_accepts.get(token).copied().unwrap_or(false) {
                Ok(())
            } else {
                Err(GatewayError::Request("fallback rejected".to_string()))
            }
        }
    }

    fn token_for(user_id: Uuid, token: &str) -> DeviceToken {
        DeviceToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            platform: "android".to_string(),
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
            revoked: false,
        }
    }

    fn mobile_event(user_id: Uuid) -> EventEnvelope {
        EventEnvelope::new(
            EVENT_MISSED_CHECKIN_ALERT,
            Some(user_id),
            vec![DeliveryTarget::Dashboard, DeliveryTarget::Mobile],
            serde_json::json!({"senior_name": "Margaret"}),
        )
    }

    fn test_config() -> PushConfig {
        PushConfig {
            propagation_delay_ms: 0,
            ..PushConfig::default()
        }
    }

    fn service(
        store: Arc<FakeTokenStore>,
        gateway: Arc<ScriptedGateway>,
        config: PushConfig,
    ) -> PushService {
        PushService::new(store, gateway, config, Arc::new(PipelineCounters::new()))
    }

    #[tokio::test]
    async fn bad_token_does_not_block_good_token() {
        let user_id = Uuid::new_v4();
        let good = token_for(user_id, "good");
        let bad = token_for(user_id, "bad");
        let bad_id = bad.id;
        let good_id = good.id;

        let store = Arc::new(FakeTokenStore::with_tokens(vec![bad, good]));
        let gateway = Arc::new(ScriptedGateway {
            unregistered: HashMap::from([("bad".to_string(), true)]),
            ..Default::default()
        });
        let svc = service(Arc::clone(&store), gateway, test_config());

        let report = svc.deliver(&mobile_event(user_id)).await.unwrap();

        assert_eq!(report.delivered_count(), 1);
        let outcomes: HashMap<Uuid, TokenOutcome> = report
            .tokens
            .iter()
            .map(|t| (t.token_id, t.outcome))
            .collect();
        assert_eq!(outcomes[&good_id], TokenOutcome::Delivered);
        assert_eq!(outcomes[&bad_id], TokenOutcome::Revoked);
        assert_eq!(store.revoked_ids(), vec![bad_id]);
    }

    #[tokio::test]
    async fn token_is_not_revoked_while_fallback_accepts_it() {
        let user_id = Uuid::new_v4();
        let token = token_for(user_id, "stale");

        let store = Arc::new(FakeTokenStore::with_tokens(vec![token]));
        let gateway = Arc::new(ScriptedGateway {
            unregistered: HashMap::from([("stale".to_string(), true)]),
            fallback_accepts: HashMap::from([("stale".to_string(), true)]),
            ..Default::default()
        });
        let svc = service(Arc::clone(&store), gateway, test_config());

        let report = svc.deliver(&mobile_event(user_id)).await.unwrap();

        assert_eq!(report.tokens[0].outcome, TokenOutcome::DeliveredViaFallback);
        assert!(store.revoked_ids().is_empty());
    }

    #[tokio::test]
    async fn fallback_disabled_revokes_unregistered_token() {
        let user_id = Uuid::new_v4();
        let token = token_for(user_id, "stale");
        let token_id = token.id;

        let store = Arc::new(FakeTokenStore::with_tokens(vec![token]));
        let gateway = Arc::new(ScriptedGateway {
            unregistered: HashMap::from([("stale".to_string(), true)]),
            fallback_accepts: HashMap::from([("stale".to_string(), true)]),
            ..Default::default()
        });
        let config = PushConfig {
            fallback_enabled: false,
            ..test_config()
        };
        let svc = service(Arc::clone(&store), Arc::clone(&gateway), config);

        let report = svc.deliver(&mobile_event(user_id)).await.unwrap();

        assert_eq!(report.tokens[0].outcome, TokenOutcome::Revoked);
        assert_eq!(store.revoked_ids(), vec![token_id]);
        // The fallback must not even be attempted when disabled.
        assert!(gateway.fallback_sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_tokens_is_a_noop_not_an_error() {
        let store = Arc::new(FakeTokenStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let svc = service(store, gateway, test_config());

        let report = svc.deliver(&mobile_event(Uuid::new_v4())).await.unwrap();
        assert!(report.is_noop());
    }

    #[tokio::test]
    async fn dashboard_only_events_are_not_pushed() {
        let user_id = Uuid::new_v4();
        let store = Arc::new(FakeTokenStore::with_tokens(vec![token_for(user_id, "t")]));
        let gateway = Arc::new(ScriptedGateway::default());
        let svc = service(store, Arc::clone(&gateway), test_config());

        let event = EventEnvelope::new(
            EVENT_MISSED_CHECKIN_ALERT,
            Some(user_id),
            vec![DeliveryTarget::Dashboard],
            serde_json::json!({}),
        );
        let report = svc.deliver(&event).await.unwrap();

        assert!(report.is_noop());
        assert!(gateway.primary_sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn every_attempted_token_is_touched() {
        let user_id = Uuid::new_v4();
        let ok = token_for(user_id, "ok");
        let dead = token_for(user_id, "dead");
        let mut expected = vec![ok.id, dead.id];

        let store = Arc::new(FakeTokenStore::with_tokens(vec![ok, dead]));
        let gateway = Arc::new(ScriptedGateway {
            unregistered: HashMap::from([("dead".to_string(), true)]),
            ..Default::default()
        });
        let svc = service(Arc::clone(&store), gateway, test_config());

        svc.deliver(&mobile_event(user_id)).await.unwrap();

        let mut touched = store.touched_ids();
        touched.sort();
        expected.sort();
        assert_eq!(touched, expected);
    }
}
