//! shellcache MCP server entry point.
//!
//! Boots the cache controller (install, activate) and only then serves tools
//! on stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{CacheController, ControllerConfig, FetchClient, FetchConfig};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let controller = Arc::new(CacheController::new(ControllerConfig::from_app_config(&config)?, db, network));

    let activated = controller.start().await?;
    controller.wait_ready().await?;
    tracing::info!(bucket = %activated.bucket, purged = activated.purged.len(), "cache controller ready");

    tracing::info!("Starting shellcache server on stdio transport");

    let handler = handler::ShellCacheServer::new(controller);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
