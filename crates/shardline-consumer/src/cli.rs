use clap::Parser;

/// Write-applier options. The registry fields describe only the bootstrap
/// database that holds the `shards` table, not the shards themselves — per
/// shard credentials live in that table and are loaded at startup.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    /// Address the consumer's health-check HTTP server listens on.
    #[arg(long, env = "SHARDLINE_CONSUMER_LISTEN", default_value = "0.0.0.0:8082")]
    pub listen: String,

    /// Bootstrap servers for the event log.
    #[arg(
        long,
        env = "SHARDLINE_LOG_BOOTSTRAP_SERVERS",
        default_value = "localhost:9092"
    )]
    pub log_bootstrap_servers: String,

    #[arg(long, env = "SHARDLINE_REGISTRY_HOST", default_value = "localhost")]
    pub registry_host: String,

    #[arg(long, env = "SHARDLINE_REGISTRY_PORT", default_value_t = 5432)]
    pub registry_port: u16,

    #[arg(long, env = "SHARDLINE_REGISTRY_DATABASE", default_value = "shardline_registry")]
    pub registry_database: String,

    #[arg(long, env = "SHARDLINE_REGISTRY_USERNAME", default_value = "shardline")]
    pub registry_username: String,

    #[arg(long, env = "SHARDLINE_REGISTRY_PASSWORD", default_value = "")]
    pub registry_password: String,

    /// Pooled connections held open per shard.
    #[arg(long, env = "SHARDLINE_MAX_CONNECTIONS_PER_SHARD", default_value_t = shardline_pool::DEFAULT_MAX_CONNECTIONS_PER_SHARD)]
    pub max_connections_per_shard: u32,

    /// Grace period the poll loop has to finish an in-flight message and
    /// commit offsets after a shutdown signal, in seconds.
    #[arg(long, env = "SHARDLINE_CONSUMER_SHUTDOWN_GRACE_SECS", default_value_t = 30)]
    pub shutdown_grace_secs: u64,
}

impl std::fmt::Debug for Opts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opts")
            .field("listen", &self.listen)
            .field("log_bootstrap_servers", &self.log_bootstrap_servers)
            .field("registry_host", &self.registry_host)
            .field("registry_port", &self.registry_port)
            .field("registry_database", &self.registry_database)
            .field("registry_username", &self.registry_username)
            .field("registry_password", &"<redacted>")
            .field("max_connections_per_shard", &self.max_connections_per_shard)
            .field("shutdown_grace_secs", &self.shutdown_grace_secs)
            .finish()
    }
}

impl Opts {
    /// The `postgres://` URL for the bootstrap registry database. Unlike
    /// [`shardline_registry::ShardDescriptor::connect_options`] this is built
    /// once from CLI/env input rather than loaded rows, so it doesn't carry
    /// the same percent-encoding concern for operator-supplied values.
    pub fn registry_bootstrap_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.registry_username,
            self.registry_password,
            self.registry_host,
            self.registry_port,
            self.registry_database
        )
    }
}
