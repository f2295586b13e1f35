use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::demo::{Demo, DemoTemplates};
use crate::executor::Executor;

/// Build the demo application, refusing to start on template errors unless
/// running in developer mode.
pub fn app(config: &ServerConfig) -> Result<Router> {
    let source = DemoTemplates::new(config.templates.clone());
    let executor = Executor::from_source(Arc::new(source), config.developer);
    let router = Demo::new().router(&executor);

    let errors = executor.flush_errors();
    for err in &errors {
        error!(error = %err, "template error");
    }
    if !errors.is_empty() {
        bail!("{} template error(s), see log", errors.len());
    }
    if executor.is_developer() {
        warn!("developer mode: templates reload on every request");
    }
    Ok(router.layer(TraceLayer::new_for_http()))
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let app = app(&config)?;
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "pagetree listening");
    axum::serve(listener, app).await?;
    Ok(())
}
