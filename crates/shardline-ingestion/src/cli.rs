use clap::Parser;

/// Ingestion tier options. Every field has a default and can be overridden
/// by its `env` variable, matching the teacher's `GlobalOpts`/CLI idiom;
/// nothing here is secret-bearing, so it's safe to print with `{:?}`.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    /// Address the ingestion HTTP server listens on.
    #[arg(long, env = "SHARDLINE_INGESTION_LISTEN", default_value = "0.0.0.0:8081")]
    pub listen: String,

    /// Bootstrap servers for the event log.
    #[arg(
        long,
        env = "SHARDLINE_LOG_BOOTSTRAP_SERVERS",
        default_value = "localhost:9092"
    )]
    pub log_bootstrap_servers: String,

    /// Per-publish send timeout, in milliseconds.
    #[arg(long, env = "SHARDLINE_INGESTION_SEND_TIMEOUT_MS", default_value_t = 5_000)]
    pub send_timeout_ms: u64,
}
