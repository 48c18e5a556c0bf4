mod cli;
mod error;
mod handlers;
mod response;
mod state;

use std::io;
use std::net::SocketAddr;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use cli::Opts;
use shardline_log::KafkaEventPublisher;
use snafu::{ResultExt, Snafu, Whatever};
use state::{AppState, SharedAppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_TARGET: &str = "shardline::ingestion";

type WhateverResult<T> = std::result::Result<T, Whatever>;

#[derive(Debug, Snafu)]
pub enum IngestionStartError {
    #[snafu(display("invalid listen address {listen:?}: {source}"))]
    ListenAddr {
        listen: String,
        source: std::net::AddrParseError,
    },
    #[snafu(transparent)]
    Io { source: io::Error },
    #[snafu(display("failed to connect event publisher: {source}"))]
    Publisher { source: shardline_log::PublishError },
}

pub type IngestionStartResult<T> = std::result::Result<T, IngestionStartError>;

fn build_router(state: SharedAppState) -> Router {
    Router::new()
        .route("/api/posts", post(handlers::create_post))
        .route("/api/comments", post(handlers::create_comment))
        .route("/api/likes", post(handlers::like))
        .route("/health", get(handlers::health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[snafu::report]
#[tokio::main]
async fn main() -> IngestionStartResult<()> {
    let _ = init_logging();

    let opts = Opts::parse();
    info!(target: LOG_TARGET, ?opts, "Starting ingestion tier");

    let publisher = KafkaEventPublisher::new(
        &opts.log_bootstrap_servers,
        Duration::from_millis(opts.send_timeout_ms),
    )
    .context(PublisherSnafu)?;

    let state: SharedAppState = Arc::new(AppState {
        publisher: Arc::new(publisher),
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

pub fn init_logging() -> WhateverResult<()> {
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
