//! HTTP handlers for the three write operations plus `/health`, per spec §6
//! and §4.2. Each handler: validates, synthesizes an event with a fresh id
//! and `timestamp = now()`, publishes it keyed by the actor's `user_id`,
//! and returns `202` with the assigned id. Validation failures never reach
//! the publisher.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shardline_core::{
    validate_comment_fields, validate_like_fields, validate_post_fields, ActivityEvent,
    CommentCreatedEvent, CommentId, LikeAction, LikeEvent, LikeId, PostCreatedEvent, PostId,
};

use crate::error::IngestionResult;
use crate::response::{AppJson, Envelope};
use crate::state::SharedAppState;

const LOG_TARGET: &str = "shardline::ingestion::handlers";

async fn publish(state: &SharedAppState, event: &ActivityEvent) -> IngestionResult<()> {
    let payload = serde_json::to_vec(event).expect("ActivityEvent always serializes");
    state
        .publisher
        .publish(event.topic(), event.routing_key(), payload)
        .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub user_id: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePostData {
    pub post_id: PostId,
}

pub async fn create_post(
    State(state): State<SharedAppState>,
    Json(req): Json<CreatePostRequest>,
) -> IngestionResult<(StatusCode, AppJson<Envelope<CreatePostData>>)> {
    validate_post_fields(&req.user_id, &req.content)?;

    let event = PostCreatedEvent {
        id: PostId::generate(),
        user_id: req.user_id,
        content: req.content,
        timestamp: Utc::now(),
    };
    let post_id = event.id;
    publish(&state, &ActivityEvent::PostCreated(event)).await?;

    tracing::info!(target: LOG_TARGET, %post_id, "Accepted post");
    Ok((
        StatusCode::ACCEPTED,
        AppJson(Envelope::accepted("post accepted", CreatePostData { post_id })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub user_id: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCommentData {
    pub comment_id: CommentId,
}

pub async fn create_comment(
    State(state): State<SharedAppState>,
    Json(req): Json<CreateCommentRequest>,
) -> IngestionResult<(StatusCode, AppJson<Envelope<CreateCommentData>>)> {
    validate_comment_fields(&req.post_id, &req.user_id, &req.content)?;

    // post_id is carried as an opaque string on the wire but stored as a
    // UUID; a post_id that doesn't parse as one is a validation failure,
    // not a publish failure, since it can never resolve to a real post.
    let post_id = req
        .post_id
        .parse::<PostId>()
        .map_err(|_| shardline_core::ValidationError::EmptyPostId)?;

    let event = CommentCreatedEvent {
        id: CommentId::generate(),
        post_id,
        user_id: req.user_id,
        content: req.content,
        timestamp: Utc::now(),
    };
    let comment_id = event.id;
    publish(&state, &ActivityEvent::CommentCreated(event)).await?;

    tracing::info!(target: LOG_TARGET, %comment_id, "Accepted comment");
    Ok((
        StatusCode::ACCEPTED,
        AppJson(Envelope::accepted(
            "comment accepted",
            CreateCommentData { comment_id },
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub post_id: String,
    pub user_id: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct LikeData {
    pub like_id: LikeId,
}

pub async fn like(
    State(state): State<SharedAppState>,
    Json(req): Json<LikeRequest>,
) -> IngestionResult<(StatusCode, AppJson<Envelope<LikeData>>)> {
    validate_like_fields(&req.post_id, &req.user_id)?;

    let post_id = req
        .post_id
        .parse::<PostId>()
        .map_err(|_| shardline_core::ValidationError::EmptyPostId)?;

    let action = match req.action.as_str() {
        "like" => LikeAction::Like,
        "unlike" => LikeAction::Unlike,
        other => {
            return Err(shardline_core::ValidationError::UnknownAction {
                action: other.to_string(),
            }
            .into())
        }
    };

    let event = LikeEvent {
        id: LikeId::generate(),
        post_id,
        user_id: req.user_id,
        action,
        timestamp: Utc::now(),
    };
    let like_id = event.id;
    publish(&state, &ActivityEvent::Like(event)).await?;

    tracing::info!(target: LOG_TARGET, %like_id, ?action, "Accepted like action");
    Ok((
        StatusCode::ACCEPTED,
        AppJson(Envelope::accepted("like accepted", LikeData { like_id })),
    ))
}

/// Ingestion's health check is unconditional per spec §4.5: the producer is
/// stateless, so there's nothing to probe.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use shardline_log::InMemoryEventPublisher;
    use tower::ServiceExt as _;

    use super::*;
    use crate::state::AppState;

    fn test_router() -> (Router, Arc<InMemoryEventPublisher>) {
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let state = Arc::new(AppState {
            publisher: publisher.clone(),
        });
        (crate::build_router(state), publisher)
    }

    #[tokio::test]
    async fn create_post_publishes_and_returns_202() {
        let (router, publisher) = test_router();

        let body = serde_json::json!({"user_id": "alice", "content": "hello"});
        let resp = router
            .oneshot(
                Request::post("/api/posts")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(publisher.records().len(), 1);
        assert_eq!(publisher.records()[0].key, "alice");
    }

    #[tokio::test]
    async fn create_post_rejects_empty_content() {
        let (router, publisher) = test_router();

        let body = serde_json::json!({"user_id": "alice", "content": ""});
        let resp = router
            .oneshot(
                Request::post("/api/posts")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(publisher.records().is_empty());
    }

    #[tokio::test]
    async fn create_post_rejects_overlong_content() {
        let (router, _publisher) = test_router();
        let body = serde_json::json!({"user_id": "alice", "content": "a".repeat(281)});
        let resp = router
            .oneshot(
                Request::post("/api/posts")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn comment_is_keyed_by_commenter_not_post_author() {
        let (router, publisher) = test_router();
        let post_id = PostId::generate();

        let body = serde_json::json!({
            "post_id": post_id.to_string(),
            "user_id": "bob",
            "content": "nice post",
        });
        let resp = router
            .oneshot(
                Request::post("/api/comments")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(publisher.records()[0].key, "bob");
    }

    #[tokio::test]
    async fn like_rejects_unknown_action() {
        let (router, publisher) = test_router();
        let body = serde_json::json!({
            "post_id": PostId::generate().to_string(),
            "user_id": "carol",
            "action": "super-like",
        });
        let resp = router
            .oneshot(
                Request::post("/api/likes")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(publisher.records().is_empty());
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (router, _publisher) = test_router();
        let resp = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
