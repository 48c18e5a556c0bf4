use snafu::Snafu;

/// `ShardWriteError` from the spec: a transient or persistent failure while
/// applying an event. The consumer does NOT commit the offset on this
/// error; the message redelivers on the next poll.
#[derive(Debug, Snafu)]
pub enum ShardWriteError {
    #[snafu(display("shard {shard_id} write failed: {source}"))]
    Apply { shard_id: u32, source: sqlx::Error },
    #[snafu(display("shard {shard_id} is not known to this pool"))]
    UnknownShard { shard_id: u32 },
}

/// `ShardReadError` from the spec: a failure on a single shard during a
/// point or scatter query. Scatter callers contain this per-shard; a
/// single-shard point query propagates it as a `500`.
#[derive(Debug, Snafu)]
pub enum ShardReadError {
    #[snafu(display("shard {shard_id} read failed: {source}"))]
    Query { shard_id: u32, source: sqlx::Error },
    #[snafu(display("shard {shard_id} is not known to this pool"))]
    NoSuchShard { shard_id: u32 },
}

pub type ShardWriteResult<T> = std::result::Result<T, ShardWriteError>;
pub type ShardReadResult<T> = std::result::Result<T, ShardReadError>;

impl From<shardline_pool::PoolError> for ShardWriteError {
    fn from(err: shardline_pool::PoolError) -> Self {
        match err {
            shardline_pool::PoolError::UnknownShard { shard_id }
            | shardline_pool::PoolError::Connect { shard_id, .. } => {
                ShardWriteError::UnknownShard { shard_id }
            }
        }
    }
}

impl From<shardline_pool::PoolError> for ShardReadError {
    fn from(err: shardline_pool::PoolError) -> Self {
        match err {
            shardline_pool::PoolError::UnknownShard { shard_id }
            | shardline_pool::PoolError::Connect { shard_id, .. } => {
                ShardReadError::NoSuchShard { shard_id }
            }
        }
    }
}
