//! Broker traits implemented by the Redis and in-memory backends.

use async_trait::async_trait;
use tokio::sync::mpsc;

use carelink_core::result::AppResult;

/// A message received from the pub/sub bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Raw UTF-8 JSON payload.
    pub payload: String,
}

/// Receiving half of a bus subscription.
///
/// Messages for every subscribed topic are funneled into one channel;
/// the backend task feeding it owns reconnection.
#[derive(Debug)]
pub struct BusSubscription {
    rx: mpsc::Receiver<BusMessage>,
}

impl BusSubscription {
    /// Wrap a receiver fed by a backend.
    pub fn new(rx: mpsc::Receiver<BusMessage>) -> Self {
        Self { rx }
    }

    /// Receive the next message. `None` means the backend shut down.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}

/// Publish/subscribe bus at quality-of-service "at least once".
///
/// Consumers must be idempotent; duplicate delivery is the contract,
/// not a defect.
#[async_trait]
pub trait EventBus: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a JSON payload to a topic.
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()>;

    /// Subscribe to a set of topics.
    async fn subscribe(&self, topics: &[&str]) -> AppResult<BusSubscription>;
}

/// Append-only producer for the log-structured broker.
#[async_trait]
pub trait StreamProducer: Send + Sync + std::fmt::Debug + 'static {
    /// Append a JSON payload to a stream topic.
    async fn append(&self, topic: &str, payload: &str) -> AppResult<()>;
}
