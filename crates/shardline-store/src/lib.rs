//! Per-shard application logic: the [`ShardStore`] trait plus a real
//! Postgres-backed implementation and an in-memory fake for tests.

mod error;
mod memory;
mod pg;
mod rows;
pub mod schema;
mod store_trait;

pub use error::{ShardReadError, ShardReadResult, ShardWriteError, ShardWriteResult};
pub use memory::InMemoryShardStore;
pub use pg::PgShardStore;
pub use rows::{CommentRow, LikeRow, PostRow, UserStats};
pub use store_trait::{apply_routed_event, ShardStore};
