//! The built-in site served by the `pagetree` binary.
//!
//! A base layout with a navigation block, a content block filled by either a
//! home or a greeting view, and a notice block only ever filled as an include.

use std::path::PathBuf;

use axum::Router;
use http::StatusCode;
use pagetree_core::{constant, redirect, request_handler, Handler, Request, Response, ViewGraph, ViewId};
use pagetree_render::{FileSystem, KeyedStrings, TemplateError, TemplateSource};
use serde_json::{json, Value};
use tracing::warn;

use crate::adapter::view_route;
use crate::executor::Executor;

const BASE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>pagetree</title></head>
<body>
<nav>{{ block("nav", data.nav) }}</nav>
<div id="notice">{{ block("notice", data.notice) }}</div>
<main id="content">{{ block("content", data.content) }}</main>
</body>
</html>
"#;

const NAV: &str = r#"<ul>{% for link in data.links %}<li><a href="{{ link.href }}">{{ link.label }}</a></li>{% endfor %}</ul>"#;

const HOME: &str = r#"<h1>{{ data.title }}</h1><p>{{ data.message }}</p>"#;

const GREET: &str = r#"{% if data.error %}<p class="error">{{ data.error }}</p>{% else %}<h1>Hello, {{ data.name }}!</h1>{% endif %}"#;

const NOTICE: &str = r#"<p class="notice">Served for {{ data.path }}</p>"#;

pub fn builtin_templates() -> KeyedStrings {
    [
        ("base.html", BASE),
        ("nav.html", NAV),
        ("home.html", HOME),
        ("greet.html", GREET),
        ("notice.html", NOTICE),
    ]
    .into_iter()
    .collect()
}

/// Built-in templates, optionally overridden file by file from a directory.
#[derive(Debug, Clone)]
pub struct DemoTemplates {
    dir: Option<FileSystem>,
    builtin: KeyedStrings,
}

impl DemoTemplates {
    pub fn new(dir: Option<PathBuf>) -> Self {
        DemoTemplates {
            dir: dir.map(FileSystem::new),
            builtin: builtin_templates(),
        }
    }
}

impl TemplateSource for DemoTemplates {
    fn load(&self, key: &str) -> Result<String, TemplateError> {
        if let Some(dir) = &self.dir {
            match dir.load(key) {
                Err(TemplateError::NotFound(_)) => {}
                other => return other,
            }
        }
        self.builtin.load(key)
    }
}

pub struct Demo {
    pub graph: ViewGraph,
    pub home: ViewId,
    pub greet: ViewId,
    pub notice: ViewId,
}

impl Demo {
    pub fn new() -> Self {
        let mut graph = ViewGraph::new();
        let base = graph.new_view(
            "base.html",
            Handler::new(|rsp, req| {
                json!({
                    "content": rsp.handle_sub_view("content", req),
                    "nav": rsp.handle_sub_view("nav", req),
                    "notice": rsp.handle_sub_view("notice", req),
                })
            }),
        );
        graph.default_sub_view(
            base,
            "nav",
            "nav.html",
            constant(json!({
                "links": [
                    { "href": "/", "label": "Home" },
                    { "href": "/greet?name=world", "label": "Greet" },
                ]
            })),
        );
        let home = graph.default_sub_view(
            base,
            "content",
            "home.html",
            constant(json!({
                "title": "Home",
                "message": "Every view here is also reachable as a partial.",
            })),
        );
        let greet = graph.sub_view(base, "content", "greet.html", Handler::new(greet));
        let notice = graph.sub_view(
            base,
            "notice",
            "notice.html",
            request_handler(|req| json!({ "path": req.uri().path() })),
        );
        Demo {
            graph,
            home,
            greet,
            notice,
        }
    }

    /// Routes for every demo view, built with `executor`.
    pub fn router(&self, executor: &Executor) -> Router {
        let home = executor.view_handler_with_includes(&self.graph, self.home, &[self.notice]);
        let greet = executor.view_handler_with_includes(&self.graph, self.greet, &[self.notice]);
        let notice = executor.view_handler(&self.graph, self.notice).fragment_only();
        Router::new()
            .route("/", view_route(home))
            .route("/greet", view_route(greet))
            .route("/notice", view_route(notice))
    }
}

impl Default for Demo {
    fn default() -> Self {
        Self::new()
    }
}

fn greet(rsp: &mut Response<'_>, req: &Request) -> Value {
    match query_param(req, "name") {
        Some(name) if name.trim().is_empty() => {
            rsp.status(StatusCode::UNPROCESSABLE_ENTITY);
            json!({ "error": "name must not be blank" })
        }
        Some(name) => json!({ "name": name }),
        None => {
            if let Err(error) = redirect(rsp, req, "/greet?name=world", StatusCode::SEE_OTHER) {
                warn!(%error, "failed to redirect");
            }
            Value::Null
        }
    }
}

/// First value of query parameter `name`, percent-decoded.
fn query_param(req: &Request, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let decode = |s: &str| {
            urlencoding::decode(&s.replace('+', " "))
                .map(|d| d.into_owned())
                .ok()
        };
        (decode(key)? == name).then(|| decode(value)).flatten()
    })
}
