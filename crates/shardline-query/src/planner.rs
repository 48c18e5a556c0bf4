//! The Query Planner: single-shard point reads plus the three
//! scatter-gather operations from spec §4.4. Independent of HTTP and of
//! whether the store is real Postgres or the in-memory fake, so its merge
//! and partial-result logic can be exercised without a live cluster.

use std::sync::Arc;
use std::time::Duration;

use shardline_core::PostId;
use shardline_router::{route, ShardCount};
use shardline_store::{CommentRow, LikeRow, PostRow, ShardStore, UserStats};

const LOG_TARGET: &str = "shardline::query::planner";

pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDetail {
    pub post: PostRow,
    pub comments: Vec<CommentRow>,
    pub likes: Vec<LikeRow>,
    pub comment_count: usize,
    pub like_count: usize,
    /// `true` if at least one shard failed during the comments/likes
    /// scatter; such a shard's contribution is simply dropped (see spec §7,
    /// adopting the redesign flag that surfaces partialness instead of
    /// silently under-reporting).
    pub partial: bool,
    pub shards_failed: Vec<u32>,
}

pub struct Planner {
    store: Arc<dyn ShardStore>,
    shard_ids: Vec<u32>,
    shard_count: ShardCount,
    shard_timeout: Duration,
}

impl Planner {
    pub fn new(store: Arc<dyn ShardStore>, shard_ids: Vec<u32>, shard_count: ShardCount, shard_timeout: Duration) -> Self {
        Self {
            store,
            shard_ids,
            shard_count,
            shard_timeout,
        }
    }

    fn shard_for(&self, user_id: &str) -> u32 {
        route(user_id.as_bytes(), self.shard_count)
    }

    /// Single-shard, routed by `user_id`.
    pub async fn get_user_posts(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<PostRow>, shardline_store::ShardReadError> {
        let shard_id = self.shard_for(user_id);
        self.store.get_user_posts(shard_id, user_id, normalize_limit(limit), normalize_offset(offset)).await
    }

    /// Single-shard, routed by `user_id`.
    pub async fn get_user_stats(&self, user_id: &str) -> Result<UserStats, shardline_store::ShardReadError> {
        let shard_id = self.shard_for(user_id);
        self.store.get_user_stats(shard_id, user_id).await
    }

    /// Scatter-gather: a point lookup on every shard (post location is
    /// determined by the author's shard, which the planner doesn't know in
    /// advance), followed by two more scatters for comments and likes once
    /// the owning shard is found.
    pub async fn get_post(&self, post_id: PostId) -> Option<PostDetail> {
        let lookups = self.shard_ids.iter().copied().map(|shard_id| {
            let store = self.store.clone();
            let timeout = self.shard_timeout;
            async move {
                let result = tokio::time::timeout(timeout, store.get_post_by_id(shard_id, post_id)).await;
                (shard_id, result)
            }
        });
        let lookup_results = futures::future::join_all(lookups).await;

        let post = lookup_results.into_iter().find_map(|(shard_id, result)| match result {
            Ok(Ok(Some(post))) => Some(post),
            Ok(Err(err)) => {
                tracing::warn!(target: LOG_TARGET, shard_id, %err, "Shard failed during post lookup");
                None
            }
            Ok(Ok(None)) => None,
            Err(_) => {
                tracing::warn!(target: LOG_TARGET, shard_id, "Shard timed out during post lookup");
                None
            }
        })?;

        let (comments, mut shards_failed_comments) = self.scatter_comments(post_id).await;
        let (likes, mut shards_failed_likes) = self.scatter_likes(post_id).await;

        let mut shards_failed = Vec::new();
        shards_failed.append(&mut shards_failed_comments);
        shards_failed.append(&mut shards_failed_likes);
        shards_failed.sort_unstable();
        shards_failed.dedup();
        let partial = !shards_failed.is_empty();

        Some(PostDetail {
            post,
            comment_count: comments.len(),
            like_count: likes.len(),
            comments,
            likes,
            partial,
            shards_failed,
        })
    }

    async fn scatter_comments(&self, post_id: PostId) -> (Vec<CommentRow>, Vec<u32>) {
        let tasks = self.shard_ids.iter().copied().map(|shard_id| {
            let store = self.store.clone();
            let timeout = self.shard_timeout;
            async move {
                let result = tokio::time::timeout(timeout, store.get_comments_for_post(shard_id, post_id)).await;
                (shard_id, result)
            }
        });
        let results = futures::future::join_all(tasks).await;

        let mut comments = Vec::new();
        let mut failed = Vec::new();
        for (shard_id, result) in results {
            match result {
                Ok(Ok(rows)) => comments.extend(rows),
                Ok(Err(err)) => {
                    tracing::warn!(target: LOG_TARGET, shard_id, %err, "Shard failed during comment scatter");
                    failed.push(shard_id);
                }
                Err(_) => {
                    tracing::warn!(target: LOG_TARGET, shard_id, "Shard timed out during comment scatter");
                    failed.push(shard_id);
                }
            }
        }
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        (comments, failed)
    }

    async fn scatter_likes(&self, post_id: PostId) -> (Vec<LikeRow>, Vec<u32>) {
        let tasks = self.shard_ids.iter().copied().map(|shard_id| {
            let store = self.store.clone();
            let timeout = self.shard_timeout;
            async move {
                let result = tokio::time::timeout(timeout, store.get_likes_for_post(shard_id, post_id)).await;
                (shard_id, result)
            }
        });
        let results = futures::future::join_all(tasks).await;

        let mut likes = Vec::new();
        let mut failed = Vec::new();
        for (shard_id, result) in results {
            match result {
                Ok(Ok(rows)) => likes.extend(rows),
                Ok(Err(err)) => {
                    tracing::warn!(target: LOG_TARGET, shard_id, %err, "Shard failed during like scatter");
                    failed.push(shard_id);
                }
                Err(_) => {
                    tracing::warn!(target: LOG_TARGET, shard_id, "Shard timed out during like scatter");
                    failed.push(shard_id);
                }
            }
        }
        (likes, failed)
    }

    /// Scatter-gather across every shard's top-`limit` posts, merged by
    /// `created_at DESC` with a stable sort (ties broken by `id` ascending),
    /// then truncated. A shard that fails or times out simply contributes
    /// nothing; there is no partial flag here since "fewer candidates than
    /// ideal" degrades gracefully rather than surfacing an error.
    pub async fn get_recent_posts(&self, limit: i64) -> Vec<PostRow> {
        let limit = normalize_limit(limit);
        let tasks = self.shard_ids.iter().copied().map(|shard_id| {
            let store = self.store.clone();
            let timeout = self.shard_timeout;
            async move {
                let result = tokio::time::timeout(timeout, store.get_top_posts(shard_id, limit)).await;
                (shard_id, result)
            }
        });
        let results = futures::future::join_all(tasks).await;

        let mut candidates = Vec::new();
        for (shard_id, result) in results {
            match result {
                Ok(Ok(rows)) => candidates.extend(rows),
                Ok(Err(err)) => {
                    tracing::warn!(target: LOG_TARGET, shard_id, %err, "Shard failed during recency scatter");
                }
                Err(_) => {
                    tracing::warn!(target: LOG_TARGET, shard_id, "Shard timed out during recency scatter");
                }
            }
        }

        candidates.sort_by(|a: &PostRow, b: &PostRow| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        candidates.truncate(limit.max(0) as usize);
        candidates
    }
}

fn normalize_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIMIT
    } else {
        limit
    }
}

fn normalize_offset(offset: i64) -> i64 {
    offset.max(0)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use shardline_core::{CommentCreatedEvent, CommentId, LikeAction, LikeEvent, LikeId, PostCreatedEvent};
    use shardline_store::{InMemoryShardStore, ShardReadError, ShardReadResult, ShardWriteResult};

    use super::*;

    /// Wraps an [`InMemoryShardStore`] but fails every read against one
    /// designated shard, to exercise the partial-result path without a real
    /// broken Postgres connection.
    struct FlakyShardStore {
        inner: InMemoryShardStore,
        broken_shard: u32,
    }

    #[async_trait]
    impl ShardStore for FlakyShardStore {
        async fn apply_post_created(&self, shard_id: u32, event: &PostCreatedEvent) -> ShardWriteResult<()> {
            self.inner.apply_post_created(shard_id, event).await
        }
        async fn apply_comment_created(&self, shard_id: u32, event: &CommentCreatedEvent) -> ShardWriteResult<()> {
            self.inner.apply_comment_created(shard_id, event).await
        }
        async fn apply_like(&self, shard_id: u32, event: &LikeEvent) -> ShardWriteResult<()> {
            self.inner.apply_like(shard_id, event).await
        }
        async fn apply_unlike(&self, shard_id: u32, event: &LikeEvent) -> ShardWriteResult<()> {
            self.inner.apply_unlike(shard_id, event).await
        }
        async fn get_user_posts(&self, shard_id: u32, user_id: &str, limit: i64, offset: i64) -> ShardReadResult<Vec<PostRow>> {
            self.inner.get_user_posts(shard_id, user_id, limit, offset).await
        }
        async fn get_user_stats(&self, shard_id: u32, user_id: &str) -> ShardReadResult<UserStats> {
            if shard_id == self.broken_shard {
                return Err(ShardReadError::NoSuchShard { shard_id });
            }
            self.inner.get_user_stats(shard_id, user_id).await
        }
        async fn get_post_by_id(&self, shard_id: u32, post_id: PostId) -> ShardReadResult<Option<PostRow>> {
            self.inner.get_post_by_id(shard_id, post_id).await
        }
        async fn get_comments_for_post(&self, shard_id: u32, post_id: PostId) -> ShardReadResult<Vec<CommentRow>> {
            if shard_id == self.broken_shard {
                return Err(ShardReadError::NoSuchShard { shard_id });
            }
            self.inner.get_comments_for_post(shard_id, post_id).await
        }
        async fn get_likes_for_post(&self, shard_id: u32, post_id: PostId) -> ShardReadResult<Vec<LikeRow>> {
            self.inner.get_likes_for_post(shard_id, post_id).await
        }
        async fn get_top_posts(&self, shard_id: u32, limit: i64) -> ShardReadResult<Vec<PostRow>> {
            if shard_id == self.broken_shard {
                return Err(ShardReadError::NoSuchShard { shard_id });
            }
            self.inner.get_top_posts(shard_id, limit).await
        }
        async fn ping(&self, shard_id: u32) -> bool {
            shard_id != self.broken_shard
        }
    }

    fn shard_count() -> ShardCount {
        ShardCount::new(4).unwrap()
    }

    #[tokio::test]
    async fn get_user_posts_is_single_shard() {
        let store = Arc::new(InMemoryShardStore::new());
        let shard_id = route(b"alice", shard_count());
        store
            .apply_post_created(
                shard_id,
                &PostCreatedEvent {
                    id: PostId::generate(),
                    user_id: "alice".into(),
                    content: "hi".into(),
                    timestamp: Utc::now(),
                },
            )
            .await
            .unwrap();

        let planner = Planner::new(store, (0..4).collect(), shard_count(), Duration::from_secs(1));
        let posts = planner.get_user_posts("alice", 10, 0).await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn get_post_scatters_comments_and_likes_across_shards() {
        let store = Arc::new(InMemoryShardStore::new());
        let post_id = PostId::generate();
        let author_shard = route(b"alice", shard_count());
        store
            .apply_post_created(
                author_shard,
                &PostCreatedEvent {
                    id: post_id,
                    user_id: "alice".into(),
                    content: "hi".into(),
                    timestamp: Utc::now(),
                },
            )
            .await
            .unwrap();

        // A commenter and a liker who (almost certainly) land on a
        // different shard than the author, exercising the scatter.
        let comment_shard = route(b"bob", shard_count());
        store
            .apply_comment_created(
                comment_shard,
                &CommentCreatedEvent {
                    id: CommentId::generate(),
                    post_id,
                    user_id: "bob".into(),
                    content: "nice".into(),
                    timestamp: Utc::now(),
                },
            )
            .await
            .unwrap();
        let like_shard = route(b"carol", shard_count());
        store
            .apply_like(
                like_shard,
                &LikeEvent {
                    id: LikeId::generate(),
                    post_id,
                    user_id: "carol".into(),
                    action: LikeAction::Like,
                    timestamp: Utc::now(),
                },
            )
            .await
            .unwrap();

        let planner = Planner::new(store, (0..4).collect(), shard_count(), Duration::from_secs(1));
        let detail = planner.get_post(post_id).await.unwrap();
        assert_eq!(detail.comment_count, 1);
        assert_eq!(detail.like_count, 1);
        assert!(!detail.partial);
    }

    #[tokio::test]
    async fn get_post_returns_none_when_absent_from_every_shard() {
        let store = Arc::new(InMemoryShardStore::new());
        let planner = Planner::new(store, (0..4).collect(), shard_count(), Duration::from_secs(1));
        assert!(planner.get_post(PostId::generate()).await.is_none());
    }

    #[tokio::test]
    async fn get_post_marks_partial_when_a_shard_fails() {
        let inner = InMemoryShardStore::new();
        let post_id = PostId::generate();
        let author_shard = route(b"alice", shard_count());
        inner
            .apply_post_created(
                author_shard,
                &PostCreatedEvent {
                    id: post_id,
                    user_id: "alice".into(),
                    content: "hi".into(),
                    timestamp: Utc::now(),
                },
            )
            .await
            .unwrap();

        let broken_shard = (author_shard + 1) % 4;
        let store = Arc::new(FlakyShardStore { inner, broken_shard });
        let planner = Planner::new(store, (0..4).collect(), shard_count(), Duration::from_secs(1));

        let detail = planner.get_post(post_id).await.unwrap();
        assert!(detail.partial);
        assert_eq!(detail.shards_failed, vec![broken_shard]);
    }

    #[tokio::test]
    async fn get_recent_posts_merges_and_truncates_with_stable_tiebreak() {
        let store = Arc::new(InMemoryShardStore::new());
        let now = Utc::now();
        let mut all_ids = Vec::new();
        for i in 0..10u32 {
            let user_id = format!("user{i}");
            let shard_id = route(user_id.as_bytes(), shard_count());
            let event = PostCreatedEvent {
                id: PostId::generate(),
                user_id,
                content: format!("post {i}"),
                timestamp: now - ChronoDuration::seconds(i64::from(i)),
            };
            all_ids.push((event.timestamp, event.id));
            store.apply_post_created(shard_id, &event).await.unwrap();
        }

        let planner = Planner::new(store, (0..4).collect(), shard_count(), Duration::from_secs(1));
        let recent = planner.get_recent_posts(5).await;

        assert_eq!(recent.len(), 5);
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let mut expected = all_ids.clone();
        expected.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let expected_top5: Vec<PostId> = expected.into_iter().take(5).map(|(_, id)| id).collect();
        let actual: Vec<PostId> = recent.into_iter().map(|p| p.id).collect();
        assert_eq!(actual, expected_top5);
    }
}
