//! In-memory broker for tests and single-node deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::{broadcast, mpsc};

use carelink_core::result::AppResult;

use crate::traits::{BusMessage, BusSubscription, EventBus, StreamProducer};

/// In-memory broker. Pub/sub topics are broadcast channels; stream
/// topics are plain vectors, retained so tests can assert on appended
/// envelopes (the dead-letter terminality checks rely on this).
#[derive(Debug)]
pub struct MemoryBroker {
    /// Topic name → broadcast sender.
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Stream topic → appended payloads.
    streams: Mutex<HashMap<String, Vec<String>>>,
    /// Buffer size for pub/sub channels.
    buffer_size: usize,
}

impl MemoryBroker {
    /// Create a new in-memory broker.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            streams: Mutex::new(HashMap::new()),
            buffer_size,
        }
    }

    /// Payloads appended to a stream topic so far.
    pub fn stream_entries(&self, topic: &str) -> Vec<String> {
        self.streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    async fn sender_for(&self, topic: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .clone()
    }
}

#[async_trait]
impl EventBus for MemoryBroker {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        let tx = self.sender_for(topic).await;
        // No subscribers is fine; pub/sub has no durability contract.
        let _ = tx.send(payload.to_string());
        Ok(())
    }

    async fn subscribe(&self, topics: &[&str]) -> AppResult<BusSubscription> {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        for topic in topics {
            let mut source = self.sender_for(topic).await.subscribe();
            let topic = topic.to_string();
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Ok(payload) = source.recv().await {
                    if tx
                        .send(BusMessage {
                            topic: topic.clone(),
                            payload,
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        Ok(BusSubscription::new(rx))
    }
}

#[async_trait]
impl StreamProducer for MemoryBroker {
    async fn append(&self, topic: &str, payload: &str) -> AppResult<()> {
        self.streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(topic.to_string())
            .or_default()
            .push(payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let broker = MemoryBroker::new(16);
        let mut sub_a = broker.subscribe(&["alerts"]).await.unwrap();
        let mut sub_b = broker.subscribe(&["alerts"]).await.unwrap();

        broker.publish("alerts", r#"{"n":1}"#).await.unwrap();

        assert_eq!(sub_a.recv().await.unwrap().payload, r#"{"n":1}"#);
        assert_eq!(sub_b.recv().await.unwrap().payload, r#"{"n":1}"#);
    }

    #[tokio::test]
    async fn subscription_sees_only_its_topics() {
        let broker = MemoryBroker::new(16);
        let mut sub = broker.subscribe(&["a"]).await.unwrap();

        broker.publish("b", "ignored").await.unwrap();
        broker.publish("a", "kept").await.unwrap();

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.topic, "a");
        assert_eq!(msg.payload, "kept");
    }

    #[tokio::test]
    async fn stream_appends_are_retained_in_order() {
        let broker = MemoryBroker::new(16);
        broker.append("log", "one").await.unwrap();
        broker.append("log", "two").await.unwrap();

        assert_eq!(broker.stream_entries("log"), vec!["one", "two"]);
        assert!(broker.stream_entries("other").is_empty());
    }
}
