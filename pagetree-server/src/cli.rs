use std::path::PathBuf;

use clap::Parser;

/// CLI for the pagetree demo server.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "pagetree", about = "Serve a nested view tree as pages, partials and fragments")]
pub struct Cli {
    /// Optional YAML config file; command-line values take precedence
    #[arg(long, env = "PAGETREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address for HTTP
    #[arg(long, env = "PAGETREE_ADDR")]
    pub listen_addr: Option<String>,

    /// Directory whose files override the built-in templates
    #[arg(long, env = "PAGETREE_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// Reload templates on every request and show template errors in the browser
    #[arg(long, env = "PAGETREE_DEVELOPER")]
    pub developer: bool,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}
