//! The per-request response context and the handler cascade.
//!
//! A [`ResponseState`] is created once per request. Each handler gets a
//! [`Response`] scoped to its own node of the compiled tree; asking for a
//! child block derives a fresh `Response` for that child, runs the child's
//! handler to completion, and folds the child's status back into the parent.
//! Handlers therefore run depth first, and a parent always sees its
//! children's results before it returns.

use std::cell::{Cell, RefCell};

use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::compile::Tree;
use crate::status::merge_status;
use crate::Request;

/// A URL the client should record in its history for this response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrl {
    pub url: String,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

/// Result of running a tree's handlers to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub data: Value,
    pub status: Option<StatusCode>,
}

/// State shared by every response context of one request.
#[derive(Debug)]
pub struct ResponseState {
    id: u64,
    cancel: CancellationToken,
    finished: Cell<bool>,
    takeover: RefCell<Option<http::Response<Bytes>>>,
    page_url: RefCell<Option<PageUrl>>,
}

impl ResponseState {
    pub fn new(id: u64, cancel: CancellationToken) -> Self {
        ResponseState {
            id,
            cancel,
            finished: Cell::new(false),
            takeover: RefCell::new(None),
            page_url: RefCell::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once a handler has taken over the response.
    pub fn finished(&self) -> bool {
        self.finished.get()
    }

    /// Replace the rendered output with `response` and stop the cascade.
    /// Only the first takeover of a request counts.
    pub fn take_over(&self, response: http::Response<Bytes>) {
        if self.finished.replace(true) {
            debug!(response_id = self.id, "response already taken over, ignoring");
            return;
        }
        *self.takeover.borrow_mut() = Some(response);
    }

    pub fn take_response(&self) -> Option<http::Response<Bytes>> {
        self.takeover.borrow_mut().take()
    }

    pub fn page_url(&self) -> Option<PageUrl> {
        self.page_url.borrow().clone()
    }

    /// Run the handler of `tree`'s root, which pulls in its descendants.
    /// Returns `None` when the response was taken over along the way.
    pub fn cascade(&self, tree: &Tree, req: &Request) -> Option<Outcome> {
        if self.finished() {
            return None;
        }
        let mut rsp = Response {
            state: self,
            node: tree,
            status: None,
        };
        let data = tree.handler().call(&mut rsp, req);
        if self.finished() {
            return None;
        }
        Some(Outcome {
            data,
            status: rsp.status,
        })
    }
}

/// The response context handed to a handler.
pub struct Response<'a> {
    state: &'a ResponseState,
    node: &'a Tree,
    status: Option<StatusCode>,
}

impl<'a> Response<'a> {
    pub fn response_id(&self) -> u64 {
        self.state.id
    }

    /// Fires when the request is done with, on every exit path.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.state.cancel
    }

    pub fn finished(&self) -> bool {
        self.state.finished()
    }

    /// Template key of the node this context belongs to.
    pub fn template(&self) -> &str {
        self.node.template()
    }

    /// Indicate a status for the response. Returns the status now held,
    /// which is the larger of `code` and anything indicated before.
    pub fn status(&mut self, code: StatusCode) -> StatusCode {
        let merged = merge_status(self.status, code);
        self.status = Some(merged);
        merged
    }

    pub fn current_status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Run the handler filling `block` and return its data.
    ///
    /// Returns `None` when this node declares no such block, or when the
    /// response has been taken over, in which case the caller should stop
    /// doing work. A child that merely has nothing to say yields
    /// `Some(Value::Null)`.
    pub fn handle_sub_view(&mut self, block: &str, req: &Request) -> Option<Value> {
        if self.state.finished() {
            return None;
        }
        let Some(node) = self.node.block(block) else {
            trace!(response_id = self.state.id, block, "no such block");
            return None;
        };
        let mut child = Response {
            state: self.state,
            node,
            status: None,
        };
        trace!(response_id = self.state.id, block, template = node.template(), "sub view");
        let data = node.handler().call(&mut child, req);
        if self.state.finished() {
            return None;
        }
        if let Some(code) = child.status {
            self.status(code);
        }
        Some(data)
    }

    /// Write `response` directly, abandoning the rest of the cascade.
    pub fn respond(&self, response: http::Response<Bytes>) {
        self.state.take_over(response);
    }

    /// Tell the client which URL to record for this response.
    pub fn designate_page_url(&self, url: impl Into<String>) {
        *self.state.page_url.borrow_mut() = Some(PageUrl {
            url: url.into(),
            replace: false,
        });
    }

    /// Like [`Response::designate_page_url`], replacing the current
    /// history entry.
    pub fn replace_page_url(&self, url: impl Into<String>) {
        *self.state.page_url.borrow_mut() = Some(PageUrl {
            url: url.into(),
            replace: true,
        });
    }
}
