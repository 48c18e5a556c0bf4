//! Domain types shared by every tier: identifiers, content validation, the
//! event wire format, and the routing-key rule that binds them together.
//!
//! This crate has no I/O and no knowledge of Kafka, Postgres, or HTTP; it is
//! the vocabulary the other crates in the workspace share.

mod macros;

pub mod content;
pub mod event;
pub mod ids;
pub mod validation;

pub use content::{validate_content, ContentError, CONTENT_MAX_LEN, CONTENT_MIN_LEN};
pub use event::{ActivityEvent, CommentCreatedEvent, LikeAction, LikeEvent, PostCreatedEvent, Timestamp, Topic};
pub use ids::{CommentId, LikeId, PostId, UserId};
pub use validation::ValidationError;
