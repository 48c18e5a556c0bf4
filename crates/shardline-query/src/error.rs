use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use shardline_store::ShardReadError;
use snafu::Snafu;

use crate::response::AppJson;

/// Per spec §7: a single-shard point query failing is a `500`; a missing
/// post is a `404`, distinct from any shard error.
#[derive(Debug, Snafu)]
pub enum QueryError {
    #[snafu(transparent)]
    Shard { source: ShardReadError },
    #[snafu(display("no post with that id"))]
    PostNotFound,
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            QueryError::Shard { source } => {
                tracing::error!(target: "shardline::query", err = %source, "Shard query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, source.to_string())
            }
            QueryError::PostNotFound => (StatusCode::NOT_FOUND, self.to_string()),
        };
        (status, AppJson(ErrorBody { error: message })).into_response()
    }
}
