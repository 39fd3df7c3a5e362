//! bulwark service binary.
//!
//! Loads configuration, wires the primitives into an [`AppContext`] and runs
//! until SIGINT/SIGTERM, then stops the cache sweeper and the worker pool.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use bulwark::config::{load_config, load_from_env};
use bulwark::lifecycle::signals::wait_for_termination;
use bulwark::observability::{logging, metrics};
use bulwark::resilience::{retry, RetryPolicy};
use bulwark::store::{MemoryStore, RedisStore, Store};
use bulwark::worker::{JobRegistry, LogHandler};
use bulwark::AppContext;

#[derive(Parser)]
#[command(name = "bulwark")]
#[command(about = "Circuit breaking, rate limiting, caching and background jobs", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bulwark starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn Store> = match &config.store.url {
        Some(url) => {
            let policy = RetryPolicy::from(&config.retry);
            let redis = retry(&policy, || RedisStore::connect(url)).await?;
            Arc::new(redis)
        }
        None => {
            tracing::info!("No store configured, using in-process store");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = JobRegistry::new()
        .register("entry_created", Arc::new(LogHandler))
        .register("entry_deleted", Arc::new(LogHandler));

    let ctx = AppContext::new(config, store, registry)?;

    wait_for_termination().await;
    tracing::info!("Shutdown signal received");

    ctx.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
