use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = pagetree_server::cli::Cli::parse();
    pagetree_server::run_with_cli(cli).await
}
