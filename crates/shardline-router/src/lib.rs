//! The routing rule that binds events, log partitions, and shards.
//!
//! This crate is intentionally dependency-free: it is linked by the
//! ingestion, consumer, and query tiers alike, so "the same hash in every
//! tier" is a property of the build graph (one compiled function), not a
//! convention three reimplementations have to uphold independently.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over `bytes`.
///
/// Non-cryptographic, stable across processes and Rust versions. Chosen for
/// cheapness and cross-tier determinism, not for hash-distribution quality:
/// the important property is "same input, same output, everywhere", not
/// "perfectly uniform".
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A shard count fixed for the life of a deployment.
///
/// `N` is loaded once (the size of the Shard Registry snapshot) and never
/// changes at runtime; changing it requires an offline redistribution that
/// this crate has no opinion about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardCount(u32);

#[derive(Debug, snafu::Snafu)]
pub enum ShardCountError {
    #[snafu(display("shard count must be non-zero"))]
    Zero,
}

impl ShardCount {
    pub fn new(n: u32) -> Result<Self, ShardCountError> {
        if n == 0 {
            return Err(ShardCountError::Zero);
        }
        Ok(Self(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Maps a routing key to the shard that owns it.
///
/// Routing keys are always the actor's `user_id` in this system (see
/// `shardline-core::routing`), never a `post_id`. The router itself doesn't
/// know or care what the bytes mean; it is a pure `bytes -> shard_id`
/// function.
pub fn route(key: &[u8], shard_count: ShardCount) -> u32 {
    fnv1a_32(key) % shard_count.get()
}
