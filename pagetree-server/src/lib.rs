//! HTTP side of pagetree: turn compiled view trees into request handlers and
//! mount them on axum.

pub mod adapter;
pub mod cli;
pub mod config;
pub mod demo;
pub mod dispatch;
pub mod error_page;
pub mod executor;
pub mod server;

pub use adapter::{dispatch, view_route};
pub use dispatch::{Accepts, ViewHandler};
pub use executor::Executor;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Run the demo server using CLI args (parsed by the caller).
pub async fn run_with_cli(cli: cli::Cli) -> Result<()> {
    init_tracing(cli.verbose)?;
    let config = config::ServerConfig::from_cli(&cli)?;
    server::serve(config).await
}
