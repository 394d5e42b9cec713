//! Broker connection configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the pub/sub bus and the log-structured broker.
///
/// Both run on the same Redis deployment: pub/sub channels carry the
/// at-least-once fan-out topics, streams back the durable log topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Redis connection URL.
    pub url: String,
    /// Buffer size for in-process broadcast channels.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum entries retained per stream topic (approximate trim).
    #[serde(default = "default_stream_max_len")]
    pub stream_max_len: usize,
}

fn default_channel_buffer() -> usize {
    256
}

fn default_stream_max_len() -> usize {
    100_000
}
