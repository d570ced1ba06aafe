//! beekon-sw server entry point.
//!
//! Boots the cache worker (open, install, activate, periodic sweep) and then
//! serves MCP on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use beekon_client::CacheWorker;
use beekon_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
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
    let worker = Arc::new(CacheWorker::open(&config).await?);

    let install = worker.install().await;
    if !install.failed.is_empty() {
        tracing::warn!(failed = install.failed.len(), "some shell resources were not precached");
    }
    worker.activate().await?;
    let sweeper = worker.spawn_sweeper();

    tracing::info!(origin = %worker.origin(), "Starting beekon-sw server on stdio transport");

    let handler = handler::CacheServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    sweeper.abort();

    Ok(())
}
