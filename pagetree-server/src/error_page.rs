//! Diagnostic page shown in developer mode when templates break.

use askama::Template;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, VARY};
use http::StatusCode;
use tracing::warn;

use crate::dispatch::status_response;

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>
body { font-family: system-ui, sans-serif; margin: 2rem; color: #222; }
h1 { color: #b00020; }
pre { background: #f6f6f6; padding: 0.75rem; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
{% for error in errors %}<pre>{{ error }}</pre>
{% endfor %}</body>
</html>
"#
)]
pub struct DeveloperErrorPage {
    pub title: String,
    pub errors: Vec<String>,
}

/// A `500` response listing `errors`.
pub fn developer_error_response(title: &str, errors: Vec<String>) -> http::Response<Bytes> {
    let page = DeveloperErrorPage {
        title: title.to_string(),
        errors,
    };
    match page.render() {
        Ok(html) => {
            let mut response = http::Response::new(Bytes::from(html));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            let headers = response.headers_mut();
            headers.insert(VARY, HeaderValue::from_static("Accept"));
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
            response
        }
        Err(error) => {
            warn!(%error, "failed to render developer error page");
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
