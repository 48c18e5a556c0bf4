use crate::macros::define_uuid_id;

define_uuid_id!(
    /// Globally unique across shards. Assigned by ingestion; the consumer
    /// never invents one, it only ever applies the id carried on the event.
    PostId
);

define_uuid_id!(
    /// Globally unique across shards, same provenance rules as [`PostId`].
    CommentId
);

define_uuid_id!(
    /// Globally unique across shards. Note this is the id of the *like
    /// event*, not a stable identity for the `(post_id, user_id)` pair: a
    /// user who likes, unlikes, then likes again produces a new `LikeId`
    /// each time, but the row-level uniqueness constraint is on
    /// `(post_id, user_id)`, not on this id.
    LikeId
);

/// An actor or author identifier. Always the routing key in this system.
pub type UserId = String;
