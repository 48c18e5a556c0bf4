use clap::Parser;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    /// Address the query HTTP server listens on.
    #[arg(long, env = "SHARDLINE_QUERY_LISTEN", default_value = "0.0.0.0:8083")]
    pub listen: String,

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

    /// Per-shard timeout for a single scatter task, in milliseconds. Bounds
    /// how long one hung shard can stall an entire scatter-gather request.
    #[arg(long, env = "SHARDLINE_QUERY_SHARD_TIMEOUT_MS", default_value_t = 2_000)]
    pub shard_timeout_ms: u64,
}

impl std::fmt::Debug for Opts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opts")
            .field("listen", &self.listen)
            .field("registry_host", &self.registry_host)
            .field("registry_port", &self.registry_port)
            .field("registry_database", &self.registry_database)
            .field("registry_username", &self.registry_username)
            .field("registry_password", &"<redacted>")
            .field("max_connections_per_shard", &self.max_connections_per_shard)
            .field("shard_timeout_ms", &self.shard_timeout_ms)
            .finish()
    }
}

impl Opts {
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
