//! Handler functions bound to views.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::response::Response;
use crate::Request;

type HandlerFn = dyn Fn(&mut Response<'_>, &Request) -> Value + Send + Sync;

/// The data-loading function behind a view.
///
/// A handler receives the response context scoped to its own node of the
/// compiled tree, which it uses to pull data from its child blocks, and
/// returns the data its template is executed with. Returning `Value::Null`
/// means "no data".
///
/// Handlers compare by identity: two clones of the same handler are equal,
/// two separately constructed closures never are.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

static NOOP: Lazy<Handler> = Lazy::new(|| Handler::new(|_, _| Value::Null));

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Response<'_>, &Request) -> Value + Send + Sync + 'static,
    {
        Handler(Arc::new(f))
    }

    /// The shared handler used for blocks nothing fills.
    pub fn noop() -> Self {
        NOOP.clone()
    }

    pub fn is_noop(&self) -> bool {
        Arc::ptr_eq(&self.0, &NOOP.0)
    }

    pub fn call(&self, rsp: &mut Response<'_>, req: &Request) -> Value {
        (self.0)(rsp, req)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            f.write_str("Handler(noop)")
        } else {
            write!(f, "Handler({:p})", Arc::as_ptr(&self.0))
        }
    }
}

/// A handler that always returns a clone of `value`.
pub fn constant(value: Value) -> Handler {
    Handler::new(move |_, _| value.clone())
}

/// A handler that returns the data of its child `block` as its own.
///
/// Useful for views that only exist to give a block a template wrapper.
pub fn delegate(block: impl Into<String>) -> Handler {
    let block = block.into();
    Handler::new(move |rsp, req| rsp.handle_sub_view(&block, req).unwrap_or(Value::Null))
}

/// Wrap a function that only needs the request.
pub fn request_handler<F>(f: F) -> Handler
where
    F: Fn(&Request) -> Value + Send + Sync + 'static,
{
    Handler::new(move |_, req| f(req))
}
