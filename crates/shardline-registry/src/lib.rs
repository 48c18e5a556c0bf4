//! The Shard Registry: a small relational store holding the list of shard
//! descriptors. Loaded once at process start by every tier; there is no hot
//! reload, and adding/removing rows while the system is running has
//! undefined effect (an explicit non-goal).

use shardline_router::ShardCount;
use snafu::{ensure, ResultExt, Snafu};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::Row as _;

const LOG_TARGET: &str = "shardline::registry";

/// One row of the `shards` bootstrap table.
///
/// `Debug` redacts `secret` so a descriptor can be logged freely without
/// leaking credentials.
#[derive(Clone)]
pub struct ShardDescriptor {
    pub shard_id: u32,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub secret: String,
}

impl ShardDescriptor {
    /// Typed connection options for this shard, built from its descriptor
    /// fields. `sqlx` handles escaping a credential that contains characters
    /// that would otherwise break a connection URL, so there is no
    /// hand-rolled percent-encoding here.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.secret)
            .database(&self.database)
    }
}

impl std::fmt::Debug for ShardDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardDescriptor")
            .field("shard_id", &self.shard_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Snafu)]
pub enum RegistryError {
    #[snafu(display("failed to connect to the shard registry bootstrap database: {source}"))]
    Connect { source: sqlx::Error },
    #[snafu(display("failed to load shard descriptors: {source}"))]
    Query { source: sqlx::Error },
    #[snafu(display("shard registry returned zero rows; at least one shard is required"))]
    Empty,
    #[snafu(transparent)]
    ShardCount { source: shardline_router::ShardCountError },
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// The immutable, process-lifetime snapshot of shard descriptors.
///
/// Loaded once by [`ShardRegistry::load`]; nothing in this crate ever
/// mutates it afterward.
#[derive(Debug, Clone)]
pub struct ShardRegistry {
    shards: Vec<ShardDescriptor>,
}

impl ShardRegistry {
    /// Connects to `bootstrap_url`, reads every row of `shards` ordered by
    /// `shard_id`, and closes the bootstrap connection. Failure to load is
    /// the one fatal startup error in this system: every other error is
    /// contained to a single request or message.
    #[tracing::instrument(target = "shardline::registry", skip(bootstrap_url))]
    pub async fn load(bootstrap_url: &str) -> RegistryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(bootstrap_url)
            .await
            .context(ConnectSnafu)?;

        let rows = sqlx::query(
            "SELECT shard_id, host, port, db_name, username, password \
             FROM shards ORDER BY shard_id",
        )
        .fetch_all(&pool)
        .await
        .context(QuerySnafu)?;

        ensure!(!rows.is_empty(), EmptySnafu);

        let shards = rows
            .into_iter()
            .map(|row| ShardDescriptor {
                shard_id: row.get::<i32, _>("shard_id") as u32,
                host: row.get("host"),
                port: row.get::<i32, _>("port") as u16,
                database: row.get("db_name"),
                username: row.get("username"),
                secret: row.get("password"),
            })
            .collect::<Vec<_>>();

        tracing::info!(
            target: LOG_TARGET,
            shard_count = shards.len(),
            "Loaded shard registry"
        );

        Ok(Self { shards })
    }

    /// Builds a registry directly from descriptors, bypassing the bootstrap
    /// database. Used by tests and by any future static-config deployment
    /// mode.
    pub fn from_descriptors(shards: Vec<ShardDescriptor>) -> RegistryResult<Self> {
        ensure!(!shards.is_empty(), EmptySnafu);
        Ok(Self { shards })
    }

    pub fn descriptors(&self) -> &[ShardDescriptor] {
        &self.shards
    }

    /// `N`, for use with [`shardline_router::route`]. Computed from the
    /// loaded snapshot, never configured independently, so it can never
    /// disagree with `descriptors().len()`.
    pub fn shard_count(&self) -> RegistryResult<ShardCount> {
        Ok(ShardCount::new(self.shards.len() as u32)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(shard_id: u32) -> ShardDescriptor {
        ShardDescriptor {
            shard_id,
            host: "localhost".into(),
            port: 5432,
            database: "shard".into(),
            username: "user".into(),
            secret: "hunter2".into(),
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let formatted = format!("{:?}", descriptor(0));
        assert!(!formatted.contains("hunter2"));
        assert!(formatted.contains("<redacted>"));
    }

    #[test]
    fn connect_options_carries_descriptor_fields() {
        let mut d = descriptor(0);
        d.secret = "p@ss/word".into();
        let opts = d.connect_options();
        assert_eq!(opts.get_host(), "localhost");
        assert_eq!(opts.get_port(), 5432);
        assert_eq!(opts.get_username(), "user");
        assert_eq!(opts.get_database(), Some("shard"));
    }

    #[test]
    fn rejects_empty_snapshot() {
        assert!(matches!(
            ShardRegistry::from_descriptors(vec![]),
            Err(RegistryError::Empty)
        ));
    }

    #[test]
    fn shard_count_matches_descriptor_count() {
        let registry =
            ShardRegistry::from_descriptors(vec![descriptor(0), descriptor(1), descriptor(2)])
                .unwrap();
        assert_eq!(registry.shard_count().unwrap().get(), 3);
    }
}
