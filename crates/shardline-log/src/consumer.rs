//! The Event Log Consumer's transport layer: subscribe, poll, track
//! readiness across rebalances, commit offsets only after a message has
//! been successfully applied.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{
    Consumer, ConsumerContext, Rebalance, StreamConsumer as RdStreamConsumer,
};
use rdkafka::error::KafkaResult;
use rdkafka::message::Message;
use rdkafka::{ClientContext, TopicPartitionList};
use shardline_core::{ActivityEvent, CommentCreatedEvent, LikeEvent, PostCreatedEvent, Topic};
use snafu::ResultExt;
use tokio::sync::watch;

use crate::error::{
    CommitSnafu, ConsumeError, ConsumeResult, ConsumerConfigSnafu, DeserializeSnafu,
    EmptyPayloadSnafu, ReceiveSnafu, SubscribeSnafu, UnknownTopicSnafu,
};

const LOG_TARGET: &str = "shardline::log::consumer";

/// Fixed consumer group: a single logical group applies writes across the
/// whole deployment.
pub const CONSUMER_GROUP_ID: &str = "db-writer-group";

/// Per-instance readiness: `Starting` until the first partition assignment
/// completes, `Ready` after. There is no `Draining`/`Stopped` variant
/// tracked here — those are shutdown-sequencing concerns the binary's
/// top-level poll loop owns (see `shardline-consumer`), not a property of
/// the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Starting,
    Ready { assigned_partitions: usize },
}

impl ReadinessState {
    pub fn is_ready(self) -> bool {
        matches!(self, ReadinessState::Ready { .. })
    }
}

/// `ConsumerContext` that flips a [`watch`] channel to `Ready` on the first
/// completed partition assignment. Health checks read the channel directly;
/// there's no shared mutex between the poll loop and the health server.
#[derive(Clone)]
pub struct ReadinessContext {
    tx: watch::Sender<ReadinessState>,
}

impl ReadinessContext {
    fn new() -> (Self, watch::Receiver<ReadinessState>) {
        let (tx, rx) = watch::channel(ReadinessState::Starting);
        (Self { tx }, rx)
    }
}

impl ClientContext for ReadinessContext {}

impl ConsumerContext for ReadinessContext {
    fn pre_rebalance(&self, rebalance: &Rebalance) {
        tracing::debug!(target: LOG_TARGET, ?rebalance, "Pre-rebalance");
    }

    fn post_rebalance(&self, rebalance: &Rebalance) {
        if let Rebalance::Assign(partitions) = rebalance {
            let assigned_partitions = partitions.count();
            tracing::info!(
                target: LOG_TARGET,
                assigned_partitions,
                "Partition assignment complete, consumer is ready"
            );
            let _ = self.tx.send(ReadinessState::Ready { assigned_partitions });
        } else {
            tracing::debug!(target: LOG_TARGET, ?rebalance, "Post-rebalance (not an assign)");
        }
    }

    fn commit_callback(&self, result: KafkaResult<()>, _offsets: &TopicPartitionList) {
        if let Err(err) = result {
            tracing::warn!(target: LOG_TARGET, %err, "Offset commit failed");
        }
    }
}

/// An owned, already-classified message pulled off the log. Owned (not
/// borrowed from the underlying `rdkafka` message) so it can outlive the
/// poll iteration while the caller applies it to a shard.
#[derive(Debug, Clone)]
pub struct ConsumedMessage {
    pub topic: Topic,
    pub key: Option<String>,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl ConsumedMessage {
    fn topic_name(&self) -> &'static str {
        self.topic.as_str()
    }

    /// Deserializes this message's payload into the event kind implied by
    /// the topic it arrived on. A malformed payload is a permanent
    /// [`ConsumeError::Deserialize`] (see
    /// [`ConsumeError::is_permanent`]): the spec treats poison messages as
    /// skip-and-commit, not redeliver-and-retry.
    pub fn deserialize(&self) -> ConsumeResult<ActivityEvent> {
        match self.topic {
            Topic::Posts => serde_json::from_slice::<PostCreatedEvent>(&self.payload)
                .map(ActivityEvent::PostCreated)
                .context(DeserializeSnafu { topic: self.topic }),
            Topic::Comments => serde_json::from_slice::<CommentCreatedEvent>(&self.payload)
                .map(ActivityEvent::CommentCreated)
                .context(DeserializeSnafu { topic: self.topic }),
            Topic::Likes => serde_json::from_slice::<LikeEvent>(&self.payload)
                .map(ActivityEvent::Like)
                .context(DeserializeSnafu { topic: self.topic }),
        }
    }
}

/// The consumer side of the log: wraps a subscribed `rdkafka` consumer with
/// the readiness latch and the "only commit after apply succeeds" offset
/// discipline from the spec.
pub struct LogConsumer {
    consumer: RdStreamConsumer<ReadinessContext>,
    readiness: watch::Receiver<ReadinessState>,
}

impl LogConsumer {
    /// Builds a consumer in group [`CONSUMER_GROUP_ID`], subscribed to
    /// every topic in [`Topic::ALL`], with manual offset commit and
    /// `earliest` initial offset, matching spec §4.3 exactly.
    pub fn connect(bootstrap_servers: &str) -> ConsumeResult<Self> {
        let (context, readiness) = ReadinessContext::new();

        let consumer: RdStreamConsumer<ReadinessContext> = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", CONSUMER_GROUP_ID)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "10000")
            .set("heartbeat.interval.ms", "3000")
            .set("partition.assignment.strategy", "roundrobin")
            .create_with_context(context)
            .context(ConsumerConfigSnafu)?;

        let topics: Vec<&str> = Topic::ALL.iter().map(|t| t.as_str()).collect();
        consumer.subscribe(&topics).context(SubscribeSnafu)?;

        tracing::info!(
            target: LOG_TARGET,
            bootstrap_servers,
            group_id = CONSUMER_GROUP_ID,
            ?topics,
            "Subscribed to log"
        );

        Ok(Self {
            consumer,
            readiness,
        })
    }

    /// Current readiness snapshot, for the health endpoint.
    pub fn readiness(&self) -> ReadinessState {
        *self.readiness.borrow()
    }

    /// A clone of the readiness channel's receiver, so a separate health
    /// HTTP server task can observe it without sharing the consumer itself.
    pub fn readiness_watch(&self) -> watch::Receiver<ReadinessState> {
        self.readiness.clone()
    }

    /// Blocks until the next message arrives (or a transport error occurs),
    /// classifying it by topic and materializing an owned copy of its
    /// payload.
    pub async fn recv(&self) -> ConsumeResult<ConsumedMessage> {
        let message = self.consumer.recv().await.context(ReceiveSnafu)?;
        let partition = message.partition();
        let offset = message.offset();

        let topic = Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == message.topic())
            .ok_or_else(|| {
                UnknownTopicSnafu {
                    topic: message.topic().to_string(),
                    partition,
                    offset,
                }
                .build()
            })?;

        let key = message
            .key()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

        let Some(payload) = message.payload() else {
            return EmptyPayloadSnafu { topic, partition, offset }.fail();
        };

        Ok(ConsumedMessage {
            topic,
            key,
            partition,
            offset,
            payload: payload.to_vec(),
        })
    }

    /// Commits the offset just past `message`, per the spec's "only after
    /// apply succeeds" rule. Callers must not call this for a message whose
    /// apply failed with a transient error; the whole point is that such a
    /// message redelivers on the next poll.
    pub fn commit(&self, message: &ConsumedMessage) -> ConsumeResult<()> {
        self.commit_position(message.topic_name(), message.partition, message.offset)
    }

    /// Commits the offset just past `(topic, partition, offset)` directly,
    /// for callers that classified a poison record at `recv` time and so
    /// never got a [`ConsumedMessage`] to pass to [`Self::commit`].
    pub fn commit_position(&self, topic: &str, partition: i32, offset: i64) -> ConsumeResult<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, rdkafka::Offset::Offset(offset + 1))
            .expect("partition/offset pair is always valid here");

        self.consumer
            .commit(&tpl, rdkafka::consumer::CommitMode::Sync)
            .context(CommitSnafu)
    }
}
