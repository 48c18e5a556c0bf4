//! The event log transport: a thin, typed wrapper over `rdkafka` providing
//! the producer side (ingestion) and the consumer side (the write
//! applier), plus an in-memory fake of the producer for tests.
//!
//! Nothing in this crate knows about shards or routing; it only knows how
//! to get bytes onto a topic keyed by a string, and how to get them back
//! off again with the spec's offset-commit discipline.

mod consumer;
mod error;
mod memory;
mod producer;

pub use consumer::{ConsumedMessage, LogConsumer, ReadinessContext, ReadinessState, CONSUMER_GROUP_ID};
pub use error::{ConsumeError, ConsumeResult, PublishError, PublishResult};
pub use memory::{InMemoryEventPublisher, PublishedRecord};
pub use producer::{EventPublisher, KafkaEventPublisher, PUBLISH_RETRY_LIMIT};
