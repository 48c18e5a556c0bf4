use std::sync::Arc;

use shardline_log::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn EventPublisher>,
}

pub type SharedAppState = Arc<AppState>;
