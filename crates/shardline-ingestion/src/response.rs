//! The `{"success", "message", "data"}` envelope the spec's ingestion
//! surface uses for every response (§6), implemented as a typed wrapper
//! rather than ad hoc `serde_json::json!` calls in handlers, matching the
//! teacher's `AppJson` idiom.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn accepted(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Thin `IntoResponse` wrapper, identical in spirit to the teacher's
/// `AppJson`: a single place that decides how a success body is
/// serialized, so handlers just build the envelope and return it.
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}
