//! The consumer's standalone health listener, per spec §4.5 and §6: a tiny
//! HTTP server independent of the Kafka client, reporting the same
//! `ReadinessState` the poll loop observes via a `watch` channel.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use shardline_log::ReadinessState;
use tokio::sync::watch;

#[derive(Clone)]
struct HealthState {
    readiness: watch::Receiver<ReadinessState>,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_partitions: Option<usize>,
}

async fn health(State(state): State<HealthState>) -> Response {
    match *state.readiness.borrow() {
        ReadinessState::Starting => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthBody {
                status: "starting",
                assigned_partitions: None,
            }),
        )
            .into_response(),
        ReadinessState::Ready { assigned_partitions } => (
            StatusCode::OK,
            Json(HealthBody {
                status: "ready",
                assigned_partitions: Some(assigned_partitions),
            }),
        )
            .into_response(),
    }
}

pub fn router(readiness: watch::Receiver<ReadinessState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(HealthState { readiness })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    use super::*;

    #[tokio::test]
    async fn reports_starting_before_assignment() {
        let (_tx, rx) = watch::channel(ReadinessState::Starting);
        let resp = router(rx)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reports_ready_after_assignment() {
        let (tx, rx) = watch::channel(ReadinessState::Starting);
        tx.send(ReadinessState::Ready { assigned_partitions: 2 }).unwrap();
        let resp = router(rx)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
