//! Routes a deserialized event to its owning shard and applies it. This is
//! the piece of the poll loop that's actually worth testing against a fake
//! store — the transport (recv/commit) needs a real broker.

use std::sync::Arc;

use shardline_core::ActivityEvent;
use shardline_router::{route, ShardCount};
use shardline_store::{ShardStore, ShardWriteResult};

const LOG_TARGET: &str = "shardline::consumer::apply";

pub struct Applier {
    store: Arc<dyn ShardStore>,
    shard_count: ShardCount,
}

impl Applier {
    pub fn new(store: Arc<dyn ShardStore>, shard_count: ShardCount) -> Self {
        Self { store, shard_count }
    }

    /// Routes on the actor's `user_id` (never `post_id`, see spec §4.3) and
    /// applies the event to the shard that owns it. Returns the shard id so
    /// the caller can log it without recomputing the route.
    pub async fn apply(&self, event: &ActivityEvent) -> ShardWriteResult<u32> {
        let shard_id = route(event.routing_key().as_bytes(), self.shard_count);
        shardline_store::apply_routed_event(self.store.as_ref(), shard_id, event).await?;
        tracing::debug!(target: LOG_TARGET, shard_id, "Applied event");
        Ok(shard_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shardline_core::{
        CommentCreatedEvent, CommentId, LikeAction, LikeEvent, LikeId, PostCreatedEvent, PostId,
    };
    use shardline_store::InMemoryShardStore;

    use super::*;

    fn applier() -> (Applier, Arc<InMemoryShardStore>) {
        let store = Arc::new(InMemoryShardStore::new());
        let shard_count = ShardCount::new(4).unwrap();
        (Applier::new(store.clone(), shard_count), store)
    }

    #[tokio::test]
    async fn routes_by_actor_not_post_author() {
        let (applier, store) = applier();
        let post_id = PostId::generate();
        let comment = ActivityEvent::CommentCreated(CommentCreatedEvent {
            id: CommentId::generate(),
            post_id,
            user_id: "bob".into(),
            content: "nice".into(),
            timestamp: Utc::now(),
        });

        let shard_id = applier.apply(&comment).await.unwrap();
        let expected = route(b"bob", ShardCount::new(4).unwrap());
        assert_eq!(shard_id, expected);

        let comments = store.get_comments_for_post(shard_id, post_id).await.unwrap();
        assert_eq!(comments.len(), 1);
    }

    #[tokio::test]
    async fn redelivery_is_idempotent_across_apply_calls() {
        let (applier, store) = applier();
        let event = ActivityEvent::PostCreated(PostCreatedEvent {
            id: PostId::generate(),
            user_id: "alice".into(),
            content: "hi".into(),
            timestamp: Utc::now(),
        });

        for _ in 0..5 {
            applier.apply(&event).await.unwrap();
        }

        let (posts, _, _) = store.total_counts();
        assert_eq!(posts, 1);
    }

    #[tokio::test]
    async fn like_then_unlike_in_publication_order_leaves_no_row() {
        let (applier, store) = applier();
        let post_id = PostId::generate();
        let like = ActivityEvent::Like(LikeEvent {
            id: LikeId::generate(),
            post_id,
            user_id: "carol".into(),
            action: LikeAction::Like,
            timestamp: Utc::now(),
        });
        let unlike = ActivityEvent::Like(LikeEvent {
            id: LikeId::generate(),
            post_id,
            user_id: "carol".into(),
            action: LikeAction::Unlike,
            timestamp: Utc::now(),
        });

        let shard_id = applier.apply(&like).await.unwrap();
        applier.apply(&unlike).await.unwrap();

        let likes = store.get_likes_for_post(shard_id, post_id).await.unwrap();
        assert!(likes.is_empty());
    }
}
