mod apply;
mod cli;
mod health;

use std::io;
use std::net::SocketAddr;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use apply::Applier;
use clap::Parser;
use cli::Opts;
use shardline_log::{ConsumeError, LogConsumer};
use shardline_pool::ShardPool;
use shardline_registry::ShardRegistry;
use shardline_store::PgShardStore;
use snafu::{ResultExt, Snafu};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub const LOG_TARGET: &str = "shardline::consumer";

#[derive(Debug, Snafu)]
pub enum ConsumerStartError {
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
    #[snafu(display("failed to connect to the event log: {source}"))]
    Connect { source: ConsumeError },
}

pub type ConsumerStartResult<T> = std::result::Result<T, ConsumerStartError>;

#[snafu::report]
#[tokio::main]
async fn main() -> ConsumerStartResult<()> {
    let _ = init_logging();

    let opts = Opts::parse();
    info!(target: LOG_TARGET, ?opts, "Starting write-applier");

    let registry = ShardRegistry::load(&opts.registry_bootstrap_url())
        .await
        .context(RegistrySnafu)?;
    let shard_count = registry.shard_count().expect("registry is never empty after load");
    let pool = ShardPool::build(&registry, opts.max_connections_per_shard)
        .await
        .context(PoolSnafu)?;
    let store = Arc::new(PgShardStore::new(pool));
    let applier = Applier::new(store, shard_count);

    let consumer = LogConsumer::connect(&opts.log_bootstrap_servers)
        .context(ConnectSnafu)?;

    let health_addr = SocketAddr::from_str(&opts.listen).context(ListenAddrSnafu {
        listen: opts.listen.clone(),
    })?;
    let health_listener = TcpListener::bind(health_addr).await?;
    info!(target: LOG_TARGET, %health_addr, "Health listener bound");
    let health_router = health::router(consumer.readiness_watch());
    let health_server = tokio::spawn(async move {
        if let Err(err) = axum::serve(health_listener, health_router).await {
            error!(target: LOG_TARGET, %err, "Health server exited");
        }
    });

    run_poll_loop(consumer, applier, Duration::from_secs(opts.shutdown_grace_secs)).await;

    health_server.abort();
    Ok(())
}

/// The consumer's core loop: receive, deserialize, apply, and commit only
/// after a successful apply, per spec §4.3. Runs until a shutdown signal
/// arrives, then finishes the in-flight message (bounded by `grace_period`)
/// before returning.
async fn run_poll_loop(consumer: LogConsumer, applier: Applier, grace_period: Duration) {
    let mut shutdown = Box::pin(shutdown_signal());

    loop {
        let message = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(target: LOG_TARGET, "Shutdown signal received, draining in-flight message");
                break;
            }
            result = consumer.recv() => result,
        };

        let message = match message {
            Ok(message) => message,
            Err(err) if err.is_permanent() => {
                // A poison record at the recv level (unrecognized topic, no
                // payload): there's no ConsumedMessage to apply, so skip it
                // by committing straight past its position.
                error!(target: LOG_TARGET, %err, "Skipping unreadable record");
                if let Some((topic, partition, offset)) = err.poison_position() {
                    if let Err(commit_err) = consumer.commit_position(topic, partition, offset) {
                        warn!(target: LOG_TARGET, %commit_err, "Offset commit failed for skipped record");
                    }
                }
                continue;
            }
            Err(err) => {
                warn!(target: LOG_TARGET, %err, "Transient error receiving from the log, retrying");
                continue;
            }
        };

        // Bounded by `grace_period` so a shard that hangs mid-apply can't
        // pin the loop past a shutdown's grace window forever; a timeout
        // here just leaves the offset uncommitted, same as any other
        // transient apply failure, and the message redelivers later.
        match tokio::time::timeout(grace_period, process_message(&consumer, &applier, &message)).await {
            Ok(()) => {}
            Err(_) => {
                warn!(target: LOG_TARGET, "Processing message exceeded the grace period, will redeliver");
            }
        }
    }
}

async fn process_message(consumer: &LogConsumer, applier: &Applier, message: &shardline_log::ConsumedMessage) {
    match message.deserialize() {
        Ok(event) => match applier.apply(&event).await {
            Ok(shard_id) => {
                if let Err(err) = consumer.commit(message) {
                    warn!(target: LOG_TARGET, shard_id, %err, "Offset commit failed");
                }
            }
            Err(err) => {
                // Transient shard error: leave the offset uncommitted so
                // the message redelivers on the next poll.
                warn!(target: LOG_TARGET, %err, "Apply failed, message will redeliver");
            }
        },
        Err(err) => {
            // Deserialize failures are permanent: skip and commit so a
            // poison message can't block the partition forever.
            error!(target: LOG_TARGET, %err, "Skipping unparseable message");
            if let Err(commit_err) = consumer.commit(message) {
                warn!(target: LOG_TARGET, %commit_err, "Offset commit failed for skipped message");
            }
        }
    }
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
}
