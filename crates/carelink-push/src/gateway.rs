//! Push gateway protocols.
//!
//! The primary protocol is the gateway's legacy send endpoint keyed by a
//! server credential; the fallback is the direct HTTP v1 protocol with
//! an independently obtained bearer credential. Both go through one
//! `reqwest` client with an explicit request timeout so that a gateway
//! hang stalls only the token being delivered.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use carelink_core::config::push::PushConfig;
use carelink_core::error::AppError;

/// Notification content plus the opaque data payload sent to a device.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    /// Visible notification title.
    pub title: String,
    /// Visible notification body.
    pub body: String,
    /// Full event envelope as a JSON string, for client-side handling.
    pub data_payload: String,
}

/// Gateway-level delivery failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway reported the token permanently unknown.
    #[error("token not registered with the gateway")]
    Unregistered,
    /// Anything else: transport failures, throttling, auth problems.
    #[error("gateway request failed: {0}")]
    Request(String),
}

/// Seam for the push gateway, mockable in tests.
#[async_trait]
pub trait PushGateway: Send + Sync + std::fmt::Debug + 'static {
    /// Send through the primary protocol.
    async fn send_primary(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError>;

    /// Send through the fallback HTTP v1 protocol.
    async fn send_fallback(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError>;
}

/// FCM-backed gateway implementation.
#[derive(Debug, Clone)]
pub struct FcmGateway {
    client: reqwest::Client,
    config: PushConfig,
}

impl FcmGateway {
    /// Build the gateway client from configuration.
    pub fn new(config: PushConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::push_gateway(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn legacy_url(&self) -> String {
        format!("https://{}/fcm/send", self.config.gateway_host)
    }

    fn v1_url(&self) -> String {
        format!(
            "https://{}/v1/projects/{}/messages:send",
            self.config.gateway_host, self.config.project_id
        )
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send_primary(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError> {
        let body = serde_json::json!({
            "to": token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": {
                "payload": message.data_payload,
            },
        });

        let response = self
            .client
            .post(self.legacy_url())
            .header("Authorization", format!("key={}", self.config.server_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("primary send failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!(%status, "Primary gateway response");

        if is_unregistered_signal(status.as_u16(), &text) {
            return Err(GatewayError::Unregistered);
        }
        if status.is_success() {
            return Ok(());
        }
        Err(GatewayError::Request(format!(
            "primary send rejected: status={status} body={text}"
        )))
    }

    async fn send_fallback(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError> {
        let body = serde_json::json!({
            "message": {
                "token": token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": {
                    "payload": message.data_payload,
                },
            },
        });

        let response = self
            .client
            .post(self.v1_url())
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("fallback send failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        debug!(%status, "Fallback gateway response");

        if is_unregistered_signal(status.as_u16(), &text) {
            return Err(GatewayError::Unregistered);
        }
        Err(GatewayError::Request(format!(
            "fallback send rejected: status={status} body={text}"
        )))
    }
}

/// Whether a gateway response means "this token is permanently unknown".
///
/// The legacy protocol answers HTTP 200 with a per-token error string;
/// the v1 protocol answers 404 with an `UNREGISTERED` error code.
pub fn is_unregistered_signal(status: u16, body: &str) -> bool {
    if status == 404 {
        return true;
    }
    body.contains("NotRegistered")
        || body.contains("InvalidRegistration")
        || body.contains("UNREGISTERED")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_not_registered_is_unregistered() {
        let body = r#"{"results":[{"error":"NotRegistered"}]}"#;
        assert!(is_unregistered_signal(200, body));
    }

    #[test]
    fn v1_unregistered_code_is_unregistered() {
        let body = r#"{"error":{"status":"NOT_FOUND","details":[{"errorCode":"UNREGISTERED"}]}}"#;
        assert!(is_unregistered_signal(404, body));
        assert!(is_unregistered_signal(400, body));
    }

    #[test]
    fn not_found_status_alone_is_unregistered() {
        assert!(is_unregistered_signal(404, ""));
    }

    #[test]
    fn throttling_and_auth_errors_are_not_unregistered() {
        assert!(!is_unregistered_signal(429, r#"{"error":"quota exceeded"}"#));
        assert!(!is_unregistered_signal(401, r#"{"error":"unauthorized"}"#));
        assert!(!is_unregistered_signal(500, "internal error"));
    }
}
