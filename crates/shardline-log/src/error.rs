use snafu::Snafu;

/// `PublishError` from the spec: the log is unreachable or rejects the
/// write after retries. Ingestion surfaces this as a `500`; no partial
/// state is created and the caller is responsible for retrying.
#[derive(Debug, Snafu)]
pub enum PublishError {
    #[snafu(display(
        "failed to publish to topic {topic} after {attempts} attempt(s): {source}"
    ))]
    Kafka {
        topic: &'static str,
        attempts: u32,
        source: rdkafka::error::KafkaError,
    },
    #[snafu(display("failed to build producer: {source}"))]
    ProducerConfig { source: rdkafka::error::KafkaError },
}

pub type PublishResult<T> = std::result::Result<T, PublishError>;

/// `DeserializeError` from the spec, plus the transport-level failures a
/// real `rdkafka` consumer can surface while polling. Deserialize failures
/// are permanent (the message is skipped, offset committed); transport
/// failures are transient (the caller should retry the poll).
#[derive(Debug, Snafu)]
pub enum ConsumeError {
    #[snafu(display("failed to build consumer: {source}"))]
    ConsumerConfig { source: rdkafka::error::KafkaError },
    #[snafu(display("failed to subscribe to topics: {source}"))]
    Subscribe { source: rdkafka::error::KafkaError },
    #[snafu(display("error receiving from the log: {source}"))]
    Receive { source: rdkafka::error::KafkaError },
    #[snafu(display("message on an unrecognized topic {topic:?} at {topic}[{partition}]@{offset}"))]
    UnknownTopic {
        topic: String,
        partition: i32,
        offset: i64,
    },
    #[snafu(display("message payload is not valid UTF-8/JSON for topic {topic}: {source}"))]
    Deserialize {
        topic: shardline_core::Topic,
        source: serde_json::Error,
    },
    #[snafu(display("message on topic {topic} has no payload, at {topic}[{partition}]@{offset}"))]
    EmptyPayload {
        topic: shardline_core::Topic,
        partition: i32,
        offset: i64,
    },
    #[snafu(display("failed to commit offset: {source}"))]
    Commit { source: rdkafka::error::KafkaError },
}

pub type ConsumeResult<T> = std::result::Result<T, ConsumeError>;

impl ConsumeError {
    /// Per spec §7: deserialize failures and the two recv-level "can't even
    /// classify this message" failures are permanent and should be skipped
    /// (offset committed anyway); everything else (broker/transport errors)
    /// is transient and should leave the offset uncommitted so the message
    /// redelivers.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ConsumeError::UnknownTopic { .. }
                | ConsumeError::Deserialize { .. }
                | ConsumeError::EmptyPayload { .. }
        )
    }

    /// For the two permanent errors raised by [`crate::LogConsumer::recv`]
    /// before a [`crate::ConsumedMessage`] could be constructed, the
    /// topic/partition/offset the poison record was found at — so the poll
    /// loop can commit past it without one. `None` for every other variant,
    /// including `Deserialize`, whose caller already holds a full
    /// `ConsumedMessage` to commit against.
    pub fn poison_position(&self) -> Option<(&str, i32, i64)> {
        match self {
            ConsumeError::UnknownTopic { topic, partition, offset } => {
                Some((topic.as_str(), *partition, *offset))
            }
            ConsumeError::EmptyPayload { topic, partition, offset } => {
                Some((topic.as_str(), *partition, *offset))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_topic_is_permanent_with_a_poison_position() {
        let err = ConsumeError::UnknownTopic {
            topic: "mystery".into(),
            partition: 2,
            offset: 41,
        };
        assert!(err.is_permanent());
        assert_eq!(err.poison_position(), Some(("mystery", 2, 41)));
    }

    #[test]
    fn empty_payload_is_permanent_with_a_poison_position() {
        let err = ConsumeError::EmptyPayload {
            topic: shardline_core::Topic::Likes,
            partition: 0,
            offset: 7,
        };
        assert!(err.is_permanent());
        assert_eq!(err.poison_position(), Some((err_topic_str(&err), 0, 7)));
    }

    fn err_topic_str(err: &ConsumeError) -> &str {
        match err {
            ConsumeError::EmptyPayload { topic, .. } => topic.as_str(),
            _ => unreachable!(),
        }
    }
}
