//! Content negotiation and the response header contract.
//!
//! A request asks for a partial or a fragment by listing one of two reserved
//! media types in its `Accept` header; anything else is a full page request.

use bytes::Bytes;
use http::header::{HeaderValue, InvalidHeaderValue, ACCEPT, LOCATION, VARY};
use http::{HeaderMap, StatusCode};

use crate::response::Response;
use crate::Request;

/// Media type of a partial: a page-relative update that takes part in
/// browser history.
pub const PARTIAL_CONTENT_TYPE: &str = "application/x.pagetree-partial+xml";
/// Media type of a fragment: a free-standing snippet outside history.
pub const FRAGMENT_CONTENT_TYPE: &str = "application/x.pagetree-fragment+xml";
pub const PAGE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Canonical URL of a partial or fragment response.
pub const RESPONSE_URL_HEADER: &str = "x-response-url";
/// Set to `replace` when the client should replace its current history
/// entry rather than push a new one.
pub const RESPONSE_HISTORY_HEADER: &str = "x-response-history";
/// Location a script client should navigate to.
pub const REDIRECT_HEADER: &str = "x-pagetree-redirect";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Page,
    Partial,
    Fragment,
}

impl RequestKind {
    /// Classify by the first reserved media type found in `Accept`.
    /// Values are compared case-insensitively with whitespace and media
    /// type parameters stripped.
    pub fn classify(headers: &HeaderMap) -> RequestKind {
        for value in headers.get_all(ACCEPT) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for token in value.split(',') {
                let media = token.split(';').next().unwrap_or_default().trim();
                if media.eq_ignore_ascii_case(PARTIAL_CONTENT_TYPE) {
                    return RequestKind::Partial;
                }
                if media.eq_ignore_ascii_case(FRAGMENT_CONTENT_TYPE) {
                    return RequestKind::Fragment;
                }
            }
        }
        RequestKind::Page
    }

    pub fn content_type(self) -> &'static str {
        match self {
            RequestKind::Page => PAGE_CONTENT_TYPE,
            RequestKind::Partial => PARTIAL_CONTENT_TYPE,
            RequestKind::Fragment => FRAGMENT_CONTENT_TYPE,
        }
    }

    /// Partial and fragment requests come from script, which cannot follow
    /// a 3xx transparently.
    pub fn is_script(self) -> bool {
        !matches!(self, RequestKind::Page)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Page => "page",
            RequestKind::Partial => "partial",
            RequestKind::Fragment => "fragment",
        }
    }
}

/// Build a redirect suited to the client that sent `req`.
///
/// Page clients get `status` (expected to be a 3xx) with `Location`.
/// Script clients get `200 OK` carrying the target in the redirect header,
/// leaving navigation to the client library.
pub fn redirect_response(
    req: &Request,
    location: &str,
    status: StatusCode,
) -> Result<http::Response<Bytes>, InvalidHeaderValue> {
    let value = HeaderValue::from_str(location)?;
    let mut response = http::Response::new(Bytes::new());
    response
        .headers_mut()
        .insert(VARY, HeaderValue::from_static("Accept"));
    if RequestKind::classify(req.headers()).is_script() {
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().insert(REDIRECT_HEADER, value);
    } else {
        *response.status_mut() = status;
        response.headers_mut().insert(LOCATION, value);
    }
    Ok(response)
}

/// Redirect from inside a handler: takes over the response, finishing the
/// cascade.
pub fn redirect(
    rsp: &Response<'_>,
    req: &Request,
    location: &str,
    status: StatusCode,
) -> Result<(), InvalidHeaderValue> {
    rsp.respond(redirect_response(req, location, status)?);
    Ok(())
}
