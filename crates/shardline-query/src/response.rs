//! Response envelopes for the query tier (spec §6, §10): `{"data": ...,
//! "count": ...}` for list endpoints, a bare `{"data": ...}` for
//! single-item endpoints, with `partial`/`shards_failed` spliced in for
//! scatter-gather reads that degraded.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListEnvelope<T> {
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemEnvelope<T> {
    pub data: T,
}

impl<T> ItemEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Serialize)]
pub struct PartialItemEnvelope<T> {
    pub data: T,
    pub partial: bool,
    pub shards_failed: Vec<u32>,
}
