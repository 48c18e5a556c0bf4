use async_trait::async_trait;
use shardline_core::{CommentCreatedEvent, CommentId, LikeEvent, PostCreatedEvent, PostId};
use shardline_pool::ShardPool;
use snafu::ResultExt;
use sqlx::Row as _;

use crate::error::{ApplySnafu, QuerySnafu, ShardReadResult, ShardWriteResult};
use crate::rows::{CommentRow, LikeRow, PostRow, UserStats};
use crate::store_trait::ShardStore;

const LOG_TARGET: &str = "shardline::store::pg";

/// [`ShardStore`] backed by real per-shard Postgres pools.
pub struct PgShardStore {
    pool: ShardPool,
}

impl PgShardStore {
    pub fn new(pool: ShardPool) -> Self {
        Self { pool }
    }

    fn pg(&self, shard_id: u32) -> Result<&sqlx::PgPool, shardline_pool::PoolError> {
        self.pool.pool_for_shard(shard_id)
    }
}

#[async_trait]
impl ShardStore for PgShardStore {
    #[tracing::instrument(target = "shardline::store::pg", skip(self, event), fields(shard_id, post_id = %event.id))]
    async fn apply_post_created(
        &self,
        shard_id: u32,
        event: &PostCreatedEvent,
    ) -> ShardWriteResult<()> {
        let pg = self.pg(shard_id)?;
        sqlx::query(
            "INSERT INTO posts (id, user_id, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(event.id.into_uuid())
        .bind(&event.user_id)
        .bind(&event.content)
        .bind(event.timestamp)
        .execute(pg)
        .await
        .context(ApplySnafu { shard_id })?;
        Ok(())
    }

    #[tracing::instrument(target = "shardline::store::pg", skip(self, event), fields(shard_id, comment_id = %event.id))]
    async fn apply_comment_created(
        &self,
        shard_id: u32,
        event: &CommentCreatedEvent,
    ) -> ShardWriteResult<()> {
        let pg = self.pg(shard_id)?;
        sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(event.id.into_uuid())
        .bind(event.post_id.into_uuid())
        .bind(&event.user_id)
        .bind(&event.content)
        .bind(event.timestamp)
        .execute(pg)
        .await
        .context(ApplySnafu { shard_id })?;
        Ok(())
    }

    #[tracing::instrument(target = "shardline::store::pg", skip(self, event), fields(shard_id, like_id = %event.id))]
    async fn apply_like(&self, shard_id: u32, event: &LikeEvent) -> ShardWriteResult<()> {
        let pg = self.pg(shard_id)?;
        sqlx::query(
            "INSERT INTO likes (id, post_id, user_id, created_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (post_id, user_id) DO NOTHING",
        )
        .bind(event.id.into_uuid())
        .bind(event.post_id.into_uuid())
        .bind(&event.user_id)
        .bind(event.timestamp)
        .execute(pg)
        .await
        .context(ApplySnafu { shard_id })?;
        Ok(())
    }

    #[tracing::instrument(target = "shardline::store::pg", skip(self, event), fields(shard_id, like_id = %event.id))]
    async fn apply_unlike(&self, shard_id: u32, event: &LikeEvent) -> ShardWriteResult<()> {
        let pg = self.pg(shard_id)?;
        // Rows-affected may legitimately be 0 here: already unliked, or
        // never liked at all. That is not an error.
        sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(event.post_id.into_uuid())
            .bind(&event.user_id)
            .execute(pg)
            .await
            .context(ApplySnafu { shard_id })?;
        Ok(())
    }

    async fn get_user_posts(
        &self,
        shard_id: u32,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> ShardReadResult<Vec<PostRow>> {
        let pg = self.pg(shard_id)?;
        let rows = sqlx::query(
            "SELECT id, user_id, content, created_at, updated_at FROM posts \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pg)
        .await
        .context(QuerySnafu { shard_id })?;

        Ok(rows.into_iter().map(post_row_from_sql).collect())
    }

    async fn get_user_stats(&self, shard_id: u32, user_id: &str) -> ShardReadResult<UserStats> {
        let pg = self.pg(shard_id)?;
        let post_count: i64 = sqlx::query("SELECT count(*) FROM posts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pg)
            .await
            .context(QuerySnafu { shard_id })?
            .get(0);
        let comment_count: i64 = sqlx::query("SELECT count(*) FROM comments WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pg)
            .await
            .context(QuerySnafu { shard_id })?
            .get(0);
        let like_count: i64 = sqlx::query("SELECT count(*) FROM likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pg)
            .await
            .context(QuerySnafu { shard_id })?
            .get(0);

        Ok(UserStats {
            post_count,
            comment_count,
            like_count,
        })
    }

    async fn get_post_by_id(
        &self,
        shard_id: u32,
        post_id: PostId,
    ) -> ShardReadResult<Option<PostRow>> {
        let pg = self.pg(shard_id)?;
        let row = sqlx::query(
            "SELECT id, user_id, content, created_at, updated_at FROM posts WHERE id = $1",
        )
        .bind(post_id.into_uuid())
        .fetch_optional(pg)
        .await
        .context(QuerySnafu { shard_id })?;

        Ok(row.map(post_row_from_sql))
    }

    async fn get_comments_for_post(
        &self,
        shard_id: u32,
        post_id: PostId,
    ) -> ShardReadResult<Vec<CommentRow>> {
        let pg = self.pg(shard_id)?;
        let rows = sqlx::query(
            "SELECT id, post_id, user_id, content, created_at, updated_at FROM comments \
             WHERE post_id = $1 ORDER BY created_at ASC",
        )
        .bind(post_id.into_uuid())
        .fetch_all(pg)
        .await
        .context(QuerySnafu { shard_id })?;

        Ok(rows
            .into_iter()
            .map(|row| CommentRow {
                id: CommentId::from_uuid(row.get("id")),
                post_id: PostId::from_uuid(row.get("post_id")),
                user_id: row.get("user_id"),
                content: row.get("content"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    async fn get_likes_for_post(
        &self,
        shard_id: u32,
        post_id: PostId,
    ) -> ShardReadResult<Vec<LikeRow>> {
        let pg = self.pg(shard_id)?;
        let rows = sqlx::query(
            "SELECT id, post_id, user_id, created_at FROM likes WHERE post_id = $1",
        )
        .bind(post_id.into_uuid())
        .fetch_all(pg)
        .await
        .context(QuerySnafu { shard_id })?;

        Ok(rows
            .into_iter()
            .map(|row| LikeRow {
                id: shardline_core::LikeId::from_uuid(row.get("id")),
                post_id: PostId::from_uuid(row.get("post_id")),
                user_id: row.get("user_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn get_top_posts(&self, shard_id: u32, limit: i64) -> ShardReadResult<Vec<PostRow>> {
        let pg = self.pg(shard_id)?;
        let rows = sqlx::query(
            "SELECT id, user_id, content, created_at, updated_at FROM posts \
             ORDER BY created_at DESC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pg)
        .await
        .context(QuerySnafu { shard_id })?;

        Ok(rows.into_iter().map(post_row_from_sql).collect())
    }

    async fn ping(&self, shard_id: u32) -> bool {
        let Ok(pg) = self.pg(shard_id) else {
            return false;
        };
        let ok = sqlx::query("SELECT 1").execute(pg).await.is_ok();
        if !ok {
            tracing::warn!(target: LOG_TARGET, shard_id, "ping failed");
        }
        ok
    }
}

fn post_row_from_sql(row: sqlx::postgres::PgRow) -> PostRow {
    PostRow {
        id: PostId::from_uuid(row.get("id")),
        user_id: row.get("user_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
