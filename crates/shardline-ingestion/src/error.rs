use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use shardline_core::ValidationError;
use shardline_log::PublishError;
use snafu::Snafu;

use crate::response::AppJson;

/// The two error kinds ingestion can surface per spec §7: a local
/// validation failure (never published) or a log-publish failure (the
/// event may or may not have reached the log; the client must retry).
#[derive(Debug, Snafu)]
pub enum IngestionError {
    #[snafu(transparent)]
    Validation { source: ValidationError },
    #[snafu(transparent)]
    Publish { source: PublishError },
}

pub type IngestionResult<T> = std::result::Result<T, IngestionError>;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for IngestionError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            IngestionError::Validation { source } => (StatusCode::BAD_REQUEST, source.to_string()),
            IngestionError::Publish { source } => {
                tracing::error!(target: "shardline::ingestion", err = %source, "Publish failed");
                (StatusCode::INTERNAL_SERVER_ERROR, source.to_string())
            }
        };
        (
            status,
            AppJson(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
