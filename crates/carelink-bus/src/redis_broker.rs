//! Redis-backed broker implementation.
//!
//! Pub/sub channels carry the fan-out topics; streams (`XADD`) back the
//! log-structured topics. All publishing goes through a shared
//! [`ConnectionManager`], which owns reconnection and backoff; callers
//! never handle reconnect themselves.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;

use crate::traits::{BusMessage, BusSubscription, EventBus, StreamProducer};

/// Redis broker handle. Cheap to clone; all clones share the underlying
/// multiplexed connection.
#[derive(Clone)]
pub struct RedisBroker {
    client: redis::Client,
    manager: ConnectionManager,
    stream_max_len: usize,
}

impl std::fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBroker")
            .field("stream_max_len", &self.stream_max_len)
            .finish()
    }
}

impl RedisBroker {
    /// Connect to Redis and build the shared connection manager.
    pub async fn connect(url: &str, stream_max_len: usize) -> AppResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            AppError::with_source(ErrorKind::Broker, format!("Invalid broker URL: {e}"), e)
        })?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Broker,
                format!("Failed to connect to broker: {e}"),
                e,
            )
        })?;

        info!("Connected to Redis broker");
        Ok(Self {
            client,
            manager,
            stream_max_len,
        })
    }
}

#[async_trait]
impl EventBus for RedisBroker {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| AppError::broker(format!("PUBLISH to '{topic}' failed: {e}")))?;
        Ok(())
    }

    async fn subscribe(&self, topics: &[&str]) -> AppResult<BusSubscription> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::broker(format!("Failed to open pub/sub connection: {e}")))?;

        for topic in topics {
            pubsub
                .subscribe(*topic)
                .await
                .map_err(|e| AppError::broker(format!("SUBSCRIBE '{topic}' failed: {e}")))?;
        }
        info!(?topics, "Subscribed to bus topics");

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let topic = msg.get_channel_name().to_string();
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(topic, "Dropping non-UTF-8 bus payload: {e}");
                        continue;
                    }
                };
                if tx.send(BusMessage { topic, payload }).await.is_err() {
                    // Subscriber went away; stop forwarding.
                    break;
                }
            }
            error!("Bus subscription stream ended");
        });

        Ok(BusSubscription::new(rx))
    }
}

#[async_trait]
impl StreamProducer for RedisBroker {
    async fn append(&self, topic: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("XADD")
            .arg(topic)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.stream_max_len)
            .arg("*")
            .arg("payload")
            .arg(payload)
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AppError::broker(format!("XADD to '{topic}' failed: {e}")))?;
        Ok(())
    }
}
