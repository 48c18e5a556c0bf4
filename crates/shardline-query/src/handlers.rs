//! HTTP handlers for the query tier's four read operations plus `/health`
//! (spec §4.4, §4.5, §6).

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use shardline_core::PostId;

use crate::error::{PostNotFoundSnafu, QueryResult};
use crate::response::{AppJson, ItemEnvelope, ListEnvelope, PartialItemEnvelope};
use crate::state::SharedAppState;
use snafu::OptionExt;

#[derive(Debug, Serialize)]
pub struct PostOut {
    pub id: PostId,
    pub user_id: String,
    pub content: String,
    pub created_at: shardline_core::Timestamp,
    pub updated_at: shardline_core::Timestamp,
}

impl From<shardline_store::PostRow> for PostOut {
    fn from(row: shardline_store::PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentOut {
    pub id: shardline_core::CommentId,
    pub post_id: PostId,
    pub user_id: String,
    pub content: String,
    pub created_at: shardline_core::Timestamp,
    pub updated_at: shardline_core::Timestamp,
}

impl From<shardline_store::CommentRow> for CommentOut {
    fn from(row: shardline_store::CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LikeOut {
    pub id: shardline_core::LikeId,
    pub post_id: PostId,
    pub user_id: String,
    pub created_at: shardline_core::Timestamp,
}

impl From<shardline_store::LikeRow> for LikeOut {
    fn from(row: shardline_store::LikeRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailOut {
    pub post: PostOut,
    pub comments: Vec<CommentOut>,
    pub likes: Vec<LikeOut>,
    pub comment_count: usize,
    pub like_count: usize,
}

impl From<crate::planner::PostDetail> for PostDetailOut {
    fn from(detail: crate::planner::PostDetail) -> Self {
        Self {
            post: detail.post.into(),
            comments: detail.comments.into_iter().map(Into::into).collect(),
            likes: detail.likes.into_iter().map(Into::into).collect(),
            comment_count: detail.comment_count,
            like_count: detail.like_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserStatsOut {
    pub user_id: String,
    pub post_count: i64,
    pub comment_count: i64,
    pub like_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecentPostsParams {
    limit: Option<i64>,
}

pub async fn get_recent_posts(
    State(state): State<SharedAppState>,
    Query(params): Query<RecentPostsParams>,
) -> impl IntoResponse {
    let posts = state
        .planner
        .get_recent_posts(params.limit.unwrap_or(crate::planner::DEFAULT_LIMIT))
        .await;
    let out: Vec<PostOut> = posts.into_iter().map(Into::into).collect();
    AppJson(ListEnvelope::new(out))
}

#[derive(Debug, Deserialize)]
pub struct UserPostsParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

pub async fn get_user_posts(
    State(state): State<SharedAppState>,
    Path(user_id): Path<String>,
    Query(params): Query<UserPostsParams>,
) -> QueryResult<impl IntoResponse> {
    let posts = state
        .planner
        .get_user_posts(
            &user_id,
            params.limit.unwrap_or(crate::planner::DEFAULT_LIMIT),
            params.offset.unwrap_or(0),
        )
        .await?;
    let out: Vec<PostOut> = posts.into_iter().map(Into::into).collect();
    Ok(AppJson(ListEnvelope::new(out)))
}

pub async fn get_user_stats(
    State(state): State<SharedAppState>,
    Path(user_id): Path<String>,
) -> QueryResult<impl IntoResponse> {
    let stats = state.planner.get_user_stats(&user_id).await?;
    Ok(AppJson(ItemEnvelope::new(UserStatsOut {
        user_id,
        post_count: stats.post_count,
        comment_count: stats.comment_count,
        like_count: stats.like_count,
    })))
}

pub async fn get_post(
    State(state): State<SharedAppState>,
    Path(post_id): Path<PostId>,
) -> QueryResult<Response> {
    let detail = state.planner.get_post(post_id).await.context(PostNotFoundSnafu)?;
    let partial = detail.partial;
    let shards_failed = detail.shards_failed.clone();
    Ok(AppJson(PartialItemEnvelope {
        data: PostDetailOut::from(detail),
        partial,
        shards_failed,
    })
    .into_response())
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    healthy_shards: usize,
    total_shards: usize,
}

pub async fn health(State(state): State<SharedAppState>) -> Response {
    let pings: BTreeMap<u32, bool> = futures::future::join_all(
        state
            .shard_ids
            .iter()
            .copied()
            .map(|shard_id| async move { (shard_id, state.store.ping(shard_id).await) }),
    )
    .await
    .into_iter()
    .collect();
    let total = pings.len();
    let healthy = pings.values().filter(|ok| **ok).count();

    let body = HealthBody {
        status: if healthy == total { "healthy" } else { "degraded" },
        healthy_shards: healthy,
        total_shards: total,
    };
    let status = if healthy == total {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, AppJson(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use shardline_core::PostCreatedEvent;
    use shardline_router::{route, ShardCount};
    use shardline_store::InMemoryShardStore;
    use tower::ServiceExt as _;

    use super::*;
    use crate::planner::Planner;
    use crate::state::AppState;

    const N: u32 = 4;

    async fn test_state() -> (Arc<InMemoryShardStore>, SharedAppState) {
        let store = Arc::new(InMemoryShardStore::new());
        let shard_count = ShardCount::new(N).unwrap();
        let planner = Planner::new(store.clone(), (0..N).collect(), shard_count, Duration::from_secs(1));
        let state = Arc::new(AppState {
            planner,
            store: store.clone(),
            shard_ids: (0..N).collect(),
        });
        (store, state)
    }

    #[tokio::test]
    async fn get_user_posts_returns_empty_list_for_unknown_user() {
        let (_store, state) = test_state().await;
        let resp = crate::build_router(state)
            .oneshot(
                Request::get("/api/users/nobody/posts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_post_returns_404_when_missing() {
        let (_store, state) = test_state().await;
        let missing = PostId::generate();
        let resp = crate::build_router(state)
            .oneshot(
                Request::get(format!("/api/posts/{missing}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_post_returns_200_once_present() {
        let (store, state) = test_state().await;
        let shard_count = ShardCount::new(N).unwrap();
        let post_id = PostId::generate();
        let shard_id = route(b"alice", shard_count);
        store
            .apply_post_created(
                shard_id,
                &PostCreatedEvent {
                    id: post_id,
                    user_id: "alice".into(),
                    content: "hi".into(),
                    timestamp: Utc::now(),
                },
            )
            .await
            .unwrap();

        let resp = crate::build_router(state)
            .oneshot(
                Request::get(format!("/api/posts/{post_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_ok_when_in_memory() {
        let (_store, state) = test_state().await;
        let resp = crate::build_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
