//! Serve one request from a compiled view.
//!
//! Each request is classified by its `Accept` header, the matching tree is
//! selected, its handlers cascade, and its templates render into a buffer.
//! Only when everything succeeded does the buffer become the response body,
//! so a late failure still yields a clean error response.

use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, VARY};
use http::StatusCode;
use pagetree_core::negotiate::{RESPONSE_HISTORY_HEADER, RESPONSE_URL_HEADER};
use pagetree_core::{merge_status, Request, RequestKind, ResponseIds, ResponseState, Tree};
use pagetree_render::{ExecutorError, TemplateSet, TemplateSource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, warn};

use crate::error_page;

/// Which request kinds a handler agrees to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepts {
    Any,
    PageOnly,
    FragmentOnly,
}

impl Accepts {
    pub fn allows(self, kind: RequestKind) -> bool {
        match self {
            Accepts::Any => true,
            Accepts::PageOnly => kind == RequestKind::Page,
            Accepts::FragmentOnly => kind != RequestKind::Page,
        }
    }
}

/// A compiled tree and, unless templates are reloaded per request, its
/// prebuilt templates. `set` is `None` when construction failed.
pub(crate) struct Part {
    pub(crate) tree: Tree,
    pub(crate) set: Option<TemplateSet>,
}

enum Loaded<'a> {
    Built(&'a TemplateSet),
    Fresh(TemplateSet),
}

impl Deref for Loaded<'_> {
    type Target = TemplateSet;

    fn deref(&self) -> &TemplateSet {
        match self {
            Loaded::Built(set) => *set,
            Loaded::Fresh(set) => set,
        }
    }
}

enum Halt {
    /// A handler took over the response.
    Finished,
    Failed(http::Response<Bytes>),
}

/// Serves page, partial and fragment requests for one view.
pub struct ViewHandler {
    pub(crate) page: Part,
    pub(crate) partial: Part,
    pub(crate) includes: Vec<Part>,
    pub(crate) accepts: Accepts,
    pub(crate) ids: Arc<ResponseIds>,
    /// Set in developer mode: rebuild templates from here on every request.
    pub(crate) developer: Option<Arc<dyn TemplateSource>>,
}

impl ViewHandler {
    /// Refuse partial and fragment requests.
    pub fn page_only(mut self) -> Self {
        self.accepts = Accepts::PageOnly;
        self
    }

    /// Refuse full page requests.
    pub fn fragment_only(mut self) -> Self {
        self.accepts = Accepts::FragmentOnly;
        self
    }

    pub fn accepts(&self) -> Accepts {
        self.accepts
    }

    /// Whether a request of `kind` would be served rather than refused
    /// with `406 Not Acceptable`.
    pub fn serves(&self, kind: RequestKind) -> bool {
        self.accepts.allows(kind) && (self.developer.is_some() || self.part(kind).set.is_some())
    }

    pub fn page(&self) -> &Tree {
        &self.page.tree
    }

    pub fn partial(&self) -> &Tree {
        &self.partial.tree
    }

    pub fn includes(&self) -> impl Iterator<Item = &Tree> + '_ {
        self.includes.iter().map(|p| &p.tree)
    }

    /// Handle `req` to completion. `cancel` fires when this returns, if it
    /// has not fired already.
    pub fn serve(&self, req: Request, cancel: CancellationToken) -> http::Response<Bytes> {
        let _fire = cancel.clone().drop_guard();
        let kind = RequestKind::classify(req.headers());
        let id = self.ids.next();
        let span = debug_span!("response", id, kind = kind.as_str());
        let _enter = span.enter();

        if !self.serves(kind) {
            debug!(accepts = ?self.accepts, "not acceptable");
            return status_response(StatusCode::NOT_ACCEPTABLE);
        }

        let state = ResponseState::new(id, cancel);
        let extra: &[Part] = if kind.is_script() { &self.includes } else { &[] };
        let mut status = None;
        let mut body = String::new();

        for part in std::iter::once(self.part(kind)).chain(extra) {
            match self.render_part(part, &state, &req) {
                Ok((html, code)) => {
                    if let Some(code) = code {
                        status = Some(merge_status(status, code));
                    }
                    body.push_str(&html);
                }
                Err(Halt::Finished) => {
                    debug!("response taken over by handler");
                    let mut response = state
                        .take_response()
                        .unwrap_or_else(|| status_response(StatusCode::INTERNAL_SERVER_ERROR));
                    response
                        .headers_mut()
                        .entry(VARY)
                        .or_insert(HeaderValue::from_static("Accept"));
                    return response;
                }
                Err(Halt::Failed(response)) => return response,
            }
        }

        emit(kind, &req, &state, status, body)
    }

    fn part(&self, kind: RequestKind) -> &Part {
        match kind {
            RequestKind::Page => &self.page,
            RequestKind::Partial | RequestKind::Fragment => &self.partial,
        }
    }

    fn load<'a>(&self, part: &'a Part) -> Result<Loaded<'a>, Vec<ExecutorError>> {
        match (&self.developer, &part.set) {
            (Some(source), _) => TemplateSet::build(&part.tree, source.as_ref()).map(Loaded::Fresh),
            (None, Some(set)) => Ok(Loaded::Built(set)),
            (None, None) => Err(Vec::new()),
        }
    }

    fn render_part(
        &self,
        part: &Part,
        state: &ResponseState,
        req: &Request,
    ) -> Result<(String, Option<StatusCode>), Halt> {
        let set = self.load(part).map_err(|errors| {
            for error in &errors {
                warn!(%error, "template construction failed");
            }
            let details = errors.iter().map(ToString::to_string).collect();
            Halt::Failed(self.failure("Template errors", details))
        })?;

        let outcome = state.cascade(&part.tree, req).ok_or(Halt::Finished)?;

        match set.render(&outcome.data) {
            Ok(html) => Ok((html, outcome.status)),
            Err(error) => {
                warn!(%error, template = part.tree.template(), "render failed");
                Err(Halt::Failed(self.failure("Render error", vec![error.to_string()])))
            }
        }
    }

    fn failure(&self, title: &str, details: Vec<String>) -> http::Response<Bytes> {
        if self.developer.is_some() {
            error_page::developer_error_response(title, details)
        } else {
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

impl std::fmt::Debug for ViewHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandler")
            .field("page", &self.page.tree.templates())
            .field("partial", &self.partial.tree.templates())
            .field("includes", &self.includes.len())
            .field("accepts", &self.accepts)
            .field("developer", &self.developer.is_some())
            .finish()
    }
}

fn emit(
    kind: RequestKind,
    req: &Request,
    state: &ResponseState,
    status: Option<StatusCode>,
    body: String,
) -> http::Response<Bytes> {
    let mut response = http::Response::new(Bytes::from(body));
    *response.status_mut() = status.unwrap_or(StatusCode::OK);
    let headers = response.headers_mut();
    headers.insert(VARY, HeaderValue::from_static("Accept"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(kind.content_type()));

    if kind.is_script() {
        let designated = match kind {
            RequestKind::Partial => state.page_url(),
            _ => None,
        };
        let url = designated
            .as_ref()
            .map(|p| p.url.as_str())
            .unwrap_or_else(|| request_url(req));
        match HeaderValue::from_str(url) {
            Ok(value) => {
                headers.insert(RESPONSE_URL_HEADER, value);
            }
            Err(_) => warn!(url, "response url is not a valid header value"),
        }
        if designated.is_some_and(|p| p.replace) {
            headers.insert(RESPONSE_HISTORY_HEADER, HeaderValue::from_static("replace"));
        }
    }
    response
}

/// Path and query of the request, the URL a client records in history.
fn request_url(req: &Request) -> &str {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
}

/// A bare response carrying the standard reason phrase for `status`.
pub(crate) fn status_response(status: StatusCode) -> http::Response<Bytes> {
    let reason = status.canonical_reason().unwrap_or_default();
    let mut response = http::Response::new(Bytes::from_static(reason.as_bytes()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(VARY, HeaderValue::from_static("Accept"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
