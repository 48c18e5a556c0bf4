use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, LikeId, PostId, UserId};

/// Event-occurrence time, authored by ingestion. Distinct from a row's
/// `created_at`/`updated_at`, though the consumer sets those from this value
/// when it applies the event.
pub type Timestamp = DateTime<Utc>;

/// Wire record published to topic `posts`.
///
/// Unknown fields are tolerated on read (the default `serde` behavior for a
/// struct is to ignore extras unless `deny_unknown_fields` is set, which we
/// deliberately don't set) and never emitted on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreatedEvent {
    pub id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub timestamp: Timestamp,
}

/// Wire record published to topic `comments`.
///
/// Keyed on the log by `user_id` (the commenter), not `post_id` — see
/// [`ActivityEvent::routing_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCreatedEvent {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeAction {
    Like,
    Unlike,
}

/// Wire record published to topic `likes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeEvent {
    pub id: LikeId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub action: LikeAction,
    pub timestamp: Timestamp,
}

/// The three topics carried on the log. Consumers dispatch on *which topic*
/// a message arrived on to pick the deserialization target, they don't rely
/// on a tagged union on the wire (each topic's payload shape is exactly one
/// of these three structs, with no discriminant field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    Posts,
    Comments,
    Likes,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Posts, Topic::Comments, Topic::Likes];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Posts => "posts",
            Topic::Comments => "comments",
            Topic::Likes => "likes",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deserialized event, already bound to the topic it arrived on. This is
/// what the consumer's apply step actually pattern-matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    PostCreated(PostCreatedEvent),
    CommentCreated(CommentCreatedEvent),
    Like(LikeEvent),
}

impl ActivityEvent {
    /// The single source of truth for "what bytes does this event route
    /// on": the actor's `user_id`, never the `post_id`. Ingestion calls this
    /// to pick the log partition key; the consumer calls the same method to
    /// pick the apply-shard. Because both sides call the identical method,
    /// the routing choice can't drift out of sync the way two
    /// independently-written "use `user_id`, not `post_id`" implementations
    /// could.
    pub fn routing_key(&self) -> &str {
        match self {
            ActivityEvent::PostCreated(e) => &e.user_id,
            ActivityEvent::CommentCreated(e) => &e.user_id,
            ActivityEvent::Like(e) => &e.user_id,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            ActivityEvent::PostCreated(_) => Topic::Posts,
            ActivityEvent::CommentCreated(_) => Topic::Comments,
            ActivityEvent::Like(_) => Topic::Likes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_is_always_the_actor() {
        let post = ActivityEvent::PostCreated(PostCreatedEvent {
            id: PostId::generate(),
            user_id: "alice".into(),
            content: "hi".into(),
            timestamp: Utc::now(),
        });
        assert_eq!(post.routing_key(), "alice");

        let comment = ActivityEvent::CommentCreated(CommentCreatedEvent {
            id: CommentId::generate(),
            post_id: PostId::generate(),
            user_id: "bob".into(),
            content: "nice".into(),
            timestamp: Utc::now(),
        });
        // Routed by the commenter, not whoever authored the post.
        assert_eq!(comment.routing_key(), "bob");
    }

    #[test]
    fn round_trips_through_json() {
        let event = LikeEvent {
            id: LikeId::generate(),
            post_id: PostId::generate(),
            user_id: "carol".into(),
            action: LikeAction::Unlike,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: LikeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn tolerates_unknown_fields_on_read() {
        let json = serde_json::json!({
            "id": PostId::generate().to_string(),
            "user_id": "dave",
            "content": "hi",
            "timestamp": Utc::now(),
            "trace_id": "unrelated-future-field",
        });
        let parsed: PostCreatedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.user_id, "dave");
    }
}
