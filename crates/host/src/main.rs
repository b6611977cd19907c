//! shelf-host entry point.
//!
//! Reads lifecycle events as JSON lines on stdin and answers each on stdout.
//! Logging goes to stderr to keep stdout reserved for replies.

use std::sync::Arc;

use anyhow::{Context, Result};
use shelf_client::{FetchClient, FetchConfig};
use shelf_core::{AppConfig, CacheDb, CacheRouter};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let router_config = config.router_config().context("invalid router configuration")?;

    let storage = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", config.db_path.display()))?;
    let fetcher = FetchClient::new(FetchConfig::from(&config)).context("failed to build fetch client")?;

    tracing::info!(origin = %router_config.origin, db = %config.db_path.display(), "starting shelf-host on stdio");

    let router = CacheRouter::new(router_config, Arc::new(storage), Arc::new(fetcher));
    handler::HostAdapter::new(router)
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("stdio transport failed")?;

    tracing::info!("shelf-host stopped");
    Ok(())
}
