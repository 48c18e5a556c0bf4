use async_trait::async_trait;
use shardline_core::{CommentCreatedEvent, LikeEvent, PostCreatedEvent, PostId};

use crate::error::{ShardReadResult, ShardWriteResult};
use crate::rows::{CommentRow, LikeRow, PostRow, UserStats};

/// The write and read surface every shard exposes, independent of whether
/// the shard is a real Postgres instance ([`crate::pg::PgShardStore`]) or an
/// in-memory fake used for tests ([`crate::memory::InMemoryShardStore`]).
///
/// Every `apply_*` method is idempotent per the statement contract in the
/// spec: applying the same event any number of times leaves shard state
/// identical to applying it once. This is what lets the consumer tolerate
/// at-least-once delivery.
#[async_trait]
pub trait ShardStore: Send + Sync {
    /// Insert the post row; a repeat `id` is a no-op.
    async fn apply_post_created(
        &self,
        shard_id: u32,
        event: &PostCreatedEvent,
    ) -> ShardWriteResult<()>;

    /// Insert the comment row; a repeat `id` is a no-op.
    async fn apply_comment_created(
        &self,
        shard_id: u32,
        event: &CommentCreatedEvent,
    ) -> ShardWriteResult<()>;

    /// Insert the like row if `(post_id, user_id)` doesn't already exist; a
    /// second like event for the same pair has its `id` discarded.
    async fn apply_like(&self, shard_id: u32, event: &LikeEvent) -> ShardWriteResult<()>;

    /// Delete by `(post_id, user_id)`. Zero rows affected is not an error:
    /// the pair may have already been unliked, or never liked at all.
    async fn apply_unlike(&self, shard_id: u32, event: &LikeEvent) -> ShardWriteResult<()>;

    async fn get_user_posts(
        &self,
        shard_id: u32,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> ShardReadResult<Vec<PostRow>>;

    async fn get_user_stats(&self, shard_id: u32, user_id: &str) -> ShardReadResult<UserStats>;

    async fn get_post_by_id(
        &self,
        shard_id: u32,
        post_id: PostId,
    ) -> ShardReadResult<Option<PostRow>>;

    async fn get_comments_for_post(
        &self,
        shard_id: u32,
        post_id: PostId,
    ) -> ShardReadResult<Vec<CommentRow>>;

    async fn get_likes_for_post(
        &self,
        shard_id: u32,
        post_id: PostId,
    ) -> ShardReadResult<Vec<LikeRow>>;

    /// Top `limit` posts on this shard by `created_at DESC`, ties broken by
    /// `id` ascending. The query planner merges these per-shard results
    /// itself; this method only needs to produce a correctly-ordered,
    /// correctly-truncated local top-N.
    async fn get_top_posts(&self, shard_id: u32, limit: i64) -> ShardReadResult<Vec<PostRow>>;

    /// `SELECT 1`-equivalent liveness probe.
    async fn ping(&self, shard_id: u32) -> bool;
}

/// Applies a fully-routed event to its owning shard, dispatching on event
/// kind. This is the single call site the consumer's poll loop uses; it
/// exists so the poll loop itself doesn't need to match on event kind.
pub async fn apply_routed_event(
    store: &dyn ShardStore,
    shard_id: u32,
    event: &shardline_core::ActivityEvent,
) -> ShardWriteResult<()> {
    use shardline_core::ActivityEvent;

    match event {
        ActivityEvent::PostCreated(e) => store.apply_post_created(shard_id, e).await,
        ActivityEvent::CommentCreated(e) => store.apply_comment_created(shard_id, e).await,
        ActivityEvent::Like(e) => match e.action {
            shardline_core::LikeAction::Like => store.apply_like(shard_id, e).await,
            shardline_core::LikeAction::Unlike => store.apply_unlike(shard_id, e).await,
        },
    }
}
