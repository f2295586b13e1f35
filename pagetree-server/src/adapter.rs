//! Mount view handlers on an axum router.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::DefaultBodyLimit;
use axum::routing::{any, MethodRouter};
use http::request::Parts;
use http::StatusCode;
use pagetree_core::Request;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::dispatch::{status_response, ViewHandler};

/// Largest request body buffered before dispatch. Larger bodies are
/// refused with `413 Payload Too Large`.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// A method router answering every method with `handler`.
pub fn view_route<S>(handler: ViewHandler) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    any(move |parts: Parts, body: Bytes| {
        dispatch(handler.clone(), http::Request::from_parts(parts, body))
    })
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

/// Serve a buffered request on the blocking pool.
///
/// The cancellation token fires when dispatch completes or when this future
/// is dropped because the client went away.
pub async fn dispatch(handler: Arc<ViewHandler>, req: Request) -> axum::response::Response {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let task = tokio::task::spawn_blocking(move || handler.serve(req, cancel));
    match task.await {
        Ok(response) => response.map(Body::from),
        Err(err) => {
            error!(error = %err, "view handler panicked");
            status_response(StatusCode::INTERNAL_SERVER_ERROR).map(Body::from)
        }
    }
}
