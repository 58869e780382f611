//! # Tally Transaction Service
//!
//! Main entry point for the Tally transaction service.
//!
//! The process wires its external collaborators together at startup: load
//! and validate configuration, then initialize the cache client against the
//! shared store. The cache is a required dependency; an unreachable store
//! terminates the process instead of leaving it half-initialized.

use std::sync::Arc;
use tally_cache::{CacheInterface, RedisCacheService};
use tally_config::ConfigLoader;
use tally_core::TallyResult;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    info!("Starting Tally Transaction Service...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> TallyResult<()> {
    // Load configuration; validation fails before any connection attempt
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    info!("Environment: {}", config.app.environment);

    // Initialize the cache client; fatal if the store is unreachable
    let cache: Arc<dyn CacheInterface> =
        Arc::new(RedisCacheService::connect(config.cache.clone()).await?);

    info!(
        addr = %config.cache.addr(),
        default_ttl_secs = config.cache.default_ttl().as_secs(),
        "Cache client ready"
    );

    // Remaining collaborators (database, broker, gRPC transport) attach
    // here; each receives the shared cache handle by reference.
    shutdown_signal().await;

    drop(cache);
    info!("Server shutdown complete");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tally=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
