use std::sync::Arc;

use shardline_store::ShardStore;

use crate::planner::Planner;

pub struct AppState {
    pub planner: Planner,
    pub store: Arc<dyn ShardStore>,
    pub shard_ids: Vec<u32>,
}

pub type SharedAppState = Arc<AppState>;
