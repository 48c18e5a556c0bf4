mod cli;
mod error;
mod handlers;
mod planner;
mod response;
mod state;

use std::io;
use std::net::SocketAddr;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use cli::Opts;
use planner::Planner;
use shardline_pool::ShardPool;
use shardline_registry::ShardRegistry;
use shardline_store::PgShardStore;
use snafu::{ResultExt, Snafu};
use state::{AppState, SharedAppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_TARGET: &str = "shardline::query";

#[derive(Debug, Snafu)]
pub enum QueryStartError {
    #[snafu(display("invalid listen address {listen:?}: {source}"))]
    ListenAddr {
        listen: String,
        source: std::net::AddrParseError,
    },
    #[snafu(transparent)]
    Io { source: io::Error },
    #[snafu(display("failed to load shard registry: {source}"))]
    Registry { source: shardline_registry::RegistryError },
    #[snafu(display("failed to build shard pool: {source}"))]
    Pool { source: shardline_pool::PoolError },
}

pub type QueryStartResult<T> = std::result::Result<T, QueryStartError>;

fn build_router(state: SharedAppState) -> Router {
    Router::new()
        .route("/api/posts", get(handlers::get_recent_posts))
        .route("/api/posts/{post_id}", get(handlers::get_post))
        .route("/api/users/{user_id}/posts", get(handlers::get_user_posts))
        .route("/api/users/{user_id}/stats", get(handlers::get_user_stats))
        .route("/health", get(handlers::health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[snafu::report]
#[tokio::main]
async fn main() -> QueryStartResult<()> {
    let _ = init_logging();

    let opts = Opts::parse();
    info!(target: LOG_TARGET, ?opts, "Starting query tier");

    let registry = ShardRegistry::load(&opts.registry_bootstrap_url())
        .await
        .context(RegistrySnafu)?;
    let shard_count = registry.shard_count().expect("registry is never empty after load");
    let shard_pool = ShardPool::build(&registry, opts.max_connections_per_shard)
        .await
        .context(PoolSnafu)?;
    let shard_ids: Vec<u32> = shard_pool.shard_ids().collect();
    let store: Arc<dyn shardline_store::ShardStore> = Arc::new(PgShardStore::new(shard_pool));

    let planner = Planner::new(
        store.clone(),
        shard_ids.clone(),
        shard_count,
        Duration::from_millis(opts.shard_timeout_ms),
    );
    let state: SharedAppState = Arc::new(AppState {
        planner,
        store,
        shard_ids,
    });

    let addr = SocketAddr::from_str(&opts.listen).context(ListenAddrSnafu {
        listen: opts.listen.clone(),
    })?;
    let listener = TcpListener::bind(addr).await?;
    info!(target: LOG_TARGET, %addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn init_logging() -> Result<(), snafu::Whatever> {
    use snafu::Whatever;
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| Whatever::without_source("failed to initialize logging".to_string()))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(target: LOG_TARGET, "Shutdown signal received, draining in-flight requests");
}
