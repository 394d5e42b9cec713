//! Push delivery configuration.

use serde::{Deserialize, Serialize};

/// Push gateway and delivery tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Whether push delivery is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay in milliseconds before sending to a token, covering gateway
    /// propagation of freshly-registered tokens.
    #[serde(default = "default_propagation_delay")]
    pub propagation_delay_ms: u64,
    /// Whether the direct HTTP v1 fallback protocol is enabled.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    /// Gateway host for both protocols.
    #[serde(default = "default_gateway_host")]
    pub gateway_host: String,
    /// Cloud project identifier used by the HTTP v1 protocol.
    #[serde(default)]
    pub project_id: String,
    /// Server key credential for the primary protocol.
    #[serde(default)]
    pub server_key: String,
    /// Bearer credential for the HTTP v1 fallback. Independently obtained
    /// from the primary credential.
    #[serde(default)]
    pub access_token: String,
    /// Per-request timeout in seconds for gateway calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            propagation_delay_ms: default_propagation_delay(),
            fallback_enabled: true,
            gateway_host: default_gateway_host(),
            project_id: String::new(),
            server_key: String::new(),
            access_token: String::new(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_propagation_delay() -> u64 {
    500
}

fn default_gateway_host() -> String {
    "fcm.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
