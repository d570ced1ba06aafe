//! beekon command-line entry point.
//!
//! Runs one lifecycle phase of the cache worker against the configured
//! cache database and exits.

mod cli;
mod commands;

use anyhow::Result;
use beekon_client::CacheWorker;
use beekon_core::AppConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Commands};
use crate::commands::FetchArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load_with_file(args.config.as_deref())?;
    let worker = CacheWorker::open(&config).await?;

    match args.command {
        Commands::Fetch { url, method, headers, data, include_body } => {
            let fetch = FetchArgs { url, method, headers, data, include_body };
            commands::fetch(&worker, fetch, args.json).await
        }
        Commands::Install => commands::install(&worker, args.json).await,
        Commands::Sweep => commands::sweep(&worker, args.json).await,
        Commands::Clear { partition } => commands::clear(&worker, partition.as_deref(), args.json).await,
        Commands::Sync => commands::sync(&worker, args.json).await,
        Commands::Stats => commands::stats(&worker, args.json).await,
    }
}
