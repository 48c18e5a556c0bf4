//! An in-memory [`EventPublisher`] fake, so ingestion's HTTP handlers can be
//! exercised without a live broker. Captures every published record in
//! order, which is exactly what the ordering-guarantee tests in spec §8
//! need to assert against.

use std::sync::Mutex;

use async_trait::async_trait;
use shardline_core::Topic;

use crate::error::PublishResult;
use crate::producer::EventPublisher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    pub topic: Topic,
    pub key: String,
    pub payload: Vec<u8>,
}

#[derive(Default)]
pub struct InMemoryEventPublisher {
    records: Mutex<Vec<PublishedRecord>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PublishedRecord> {
        self.records.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, topic: Topic, key: &str, payload: Vec<u8>) -> PublishResult<()> {
        self.records.lock().expect("lock poisoned").push(PublishedRecord {
            topic,
            key: key.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_every_publish_in_order() {
        let publisher = InMemoryEventPublisher::new();
        publisher
            .publish(Topic::Posts, "alice", b"one".to_vec())
            .await
            .unwrap();
        publisher
            .publish(Topic::Posts, "alice", b"two".to_vec())
            .await
            .unwrap();

        let records = publisher.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload, b"one");
        assert_eq!(records[1].payload, b"two");
    }
}
