//! The Shard Pool: a per-process map from `shard_id` to a pooled connection
//! handle, with bounded concurrency and liveness probing.
//!
//! The registry is loaded once at startup into an immutable slice (see
//! [`shardline_registry`]); this crate turns that slice into live,
//! independently-bounded connection pools, one per shard, and is the only
//! place in the workspace that holds shared mutable state beyond the
//! pools' own internal bookkeeping (which their driver guarantees is
//! concurrency-safe).

use std::collections::BTreeMap;

use shardline_registry::ShardRegistry;
use shardline_router::ShardCount;
use snafu::{OptionExt, ResultExt, Snafu};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const LOG_TARGET: &str = "shardline::pool";

/// Default number of pooled connections held open per shard. Chosen to be
/// small: each shard already fans in from at most one consumer instance at
/// a time (the consumer holds at most one connection per message) plus
/// whatever scatter concurrency the query tier needs.
pub const DEFAULT_MAX_CONNECTIONS_PER_SHARD: u32 = 10;

#[derive(Debug, Snafu)]
pub enum PoolError {
    #[snafu(display("failed to build connection pool for shard {shard_id}: {source}"))]
    Connect { shard_id: u32, source: sqlx::Error },
    #[snafu(display("no such shard: {shard_id}"))]
    UnknownShard { shard_id: u32 },
}

pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Live connection pools for every shard in the registry snapshot.
pub struct ShardPool {
    pools: BTreeMap<u32, PgPool>,
    shard_count: ShardCount,
}

impl ShardPool {
    /// Opens one bounded pool per shard descriptor. Pools are opened eagerly
    /// (not lazily on first use) so a misconfigured shard is caught at
    /// startup rather than on the first request that happens to hit it.
    #[tracing::instrument(target = "shardline::pool", skip(registry))]
    pub async fn build(
        registry: &ShardRegistry,
        max_connections_per_shard: u32,
    ) -> PoolResult<Self> {
        let mut pools = BTreeMap::new();
        for descriptor in registry.descriptors() {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections_per_shard)
                .connect_with(descriptor.connect_options())
                .await
                .context(ConnectSnafu {
                    shard_id: descriptor.shard_id,
                })?;
            tracing::info!(
                target: LOG_TARGET,
                shard_id = descriptor.shard_id,
                "Opened shard pool"
            );
            pools.insert(descriptor.shard_id, pool);
        }

        let shard_count = registry
            .shard_count()
            .expect("registry already validated non-empty at load time");

        Ok(Self { pools, shard_count })
    }

    /// `N`, the fixed shard count this pool was built against.
    pub fn shard_count(&self) -> ShardCount {
        self.shard_count
    }

    pub fn pool_for_shard(&self, shard_id: u32) -> PoolResult<&PgPool> {
        self.pools
            .get(&shard_id)
            .context(UnknownShardSnafu { shard_id })
    }

    /// Every shard id known to this pool, in ascending order. Used by
    /// scatter-gather callers that need to fan out to all shards. Note this
    /// is whatever set of ids the registry snapshot actually contained, not
    /// necessarily a contiguous `[0, N)` range.
    pub fn shard_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.pools.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &PgPool)> {
        self.pools.iter().map(|(id, pool)| (*id, pool))
    }

    /// Pings every shard with `SELECT 1`. Returns, per shard id, whether the
    /// ping succeeded. Used by the query tier's `/health` endpoint; a single
    /// unreachable shard degrades health without failing the whole check.
    pub async fn ping_all(&self) -> BTreeMap<u32, bool> {
        let mut results = BTreeMap::new();
        for (shard_id, pool) in &self.pools {
            let ok = sqlx::query("SELECT 1").execute(pool).await.is_ok();
            if !ok {
                tracing::warn!(target: LOG_TARGET, shard_id, "Shard ping failed");
            }
            results.insert(*shard_id, ok);
        }
        results
    }
}
