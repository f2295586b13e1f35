use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, LOCATION, VARY};
use http::StatusCode;
use pagetree_core::negotiate::{
    FRAGMENT_CONTENT_TYPE, PARTIAL_CONTENT_TYPE, REDIRECT_HEADER, RESPONSE_HISTORY_HEADER,
    RESPONSE_URL_HEADER,
};
use pagetree_core::{constant, redirect, Handler, Request, ViewGraph, ViewId};
use pagetree_render::{KeyedStrings, TemplateError, TemplateSource};
use pagetree_server::{Executor, ViewHandler};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn request(uri: &str, accept: Option<&str>) -> Request {
    let mut builder = http::Request::builder().uri(uri);
    if let Some(accept) = accept {
        builder = builder.header(ACCEPT, accept);
    }
    builder.body(Bytes::new()).unwrap()
}

fn serve(handler: &ViewHandler, uri: &str, accept: Option<&str>) -> http::Response<Bytes> {
    handler.serve(request(uri, accept), CancellationToken::new())
}

fn body(rsp: &http::Response<Bytes>) -> &str {
    std::str::from_utf8(rsp.body()).unwrap()
}

/// `base.html` with blocks `content` (default `home.html`) and `notice`.
struct Site {
    graph: ViewGraph,
    home: ViewId,
    notice: ViewId,
}

fn site() -> Site {
    let mut graph = ViewGraph::new();
    let base = graph.new_view(
        "base.html",
        Handler::new(|rsp, req| {
            json!({
                "content": rsp.handle_sub_view("content", req),
                "notice": rsp.handle_sub_view("notice", req),
            })
        }),
    );
    let home = graph.default_sub_view(base, "content", "home.html", constant(json!({ "msg": "hi" })));
    let notice = graph.sub_view(base, "notice", "notice.html", constant(json!("n")));
    Site { graph, home, notice }
}

fn templates() -> KeyedStrings {
    [
        (
            "base.html",
            r#"<html>{{ block("content", data.content) }}{{ block("notice", data.notice) }}</html>"#,
        ),
        ("home.html", "<p>{{ data.msg }}</p>"),
        ("notice.html", "<aside>{{ data }}</aside>"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn page_request_renders_whole_page() {
    let s = site();
    let executor = Executor::new(templates());
    let handler = executor.view_handler(&s.graph, s.home);
    assert!(executor.flush_errors().is_empty());

    let rsp = serve(&handler, "/", Some("text/html"));
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(body(&rsp), "<html><p>hi</p></html>");
    assert_eq!(rsp.headers()[VARY], "Accept");
    assert_eq!(rsp.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
    assert!(rsp.headers().get(RESPONSE_URL_HEADER).is_none());
}

#[test]
fn partial_request_renders_from_leaf() {
    let s = site();
    let executor = Executor::new(templates());
    let handler = executor.view_handler(&s.graph, s.home);

    let rsp = serve(&handler, "/home?x=1", Some(PARTIAL_CONTENT_TYPE));
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(body(&rsp), "<p>hi</p>");
    assert_eq!(rsp.headers()[CONTENT_TYPE], PARTIAL_CONTENT_TYPE);
    assert_eq!(rsp.headers()[RESPONSE_URL_HEADER], "/home?x=1");
    assert_eq!(rsp.headers()[VARY], "Accept");
}

#[test]
fn fragment_only_handler_refuses_page_requests() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut graph = ViewGraph::new();
    let counted = calls.clone();
    let view = graph.new_view(
        "frag.html",
        Handler::new(move |_, _| {
            counted.fetch_add(1, Ordering::SeqCst);
            json!("x")
        }),
    );
    let source: KeyedStrings = [("frag.html", "<b>{{ data }}</b>")].into_iter().collect();
    let executor = Executor::new(source);
    let handler = executor.view_handler(&graph, view).fragment_only();

    let rsp = serve(&handler, "/frag", Some("*/*"));
    assert_eq!(rsp.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body(&rsp), "Not Acceptable");
    assert_eq!(rsp.headers()[VARY], "Accept");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let rsp = serve(&handler, "/frag", Some(FRAGMENT_CONTENT_TYPE));
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(body(&rsp), "<b>x</b>");
    assert_eq!(rsp.headers()[CONTENT_TYPE], FRAGMENT_CONTENT_TYPE);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn page_only_handler_refuses_partials() {
    let s = site();
    let handler = Executor::new(templates())
        .view_handler(&s.graph, s.home)
        .page_only();
    assert_eq!(serve(&handler, "/", Some(PARTIAL_CONTENT_TYPE)).status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(serve(&handler, "/", None).status(), StatusCode::OK);
}

#[test]
fn includes_are_appended_to_partials() {
    let s = site();
    let executor = Executor::new(templates());
    let handler = executor.view_handler_with_includes(&s.graph, s.home, &[s.notice]);
    assert_eq!(handler.includes().count(), 1);

    let rsp = serve(&handler, "/", Some(PARTIAL_CONTENT_TYPE));
    assert_eq!(body(&rsp), "<p>hi</p><aside>n</aside>");

    let rsp = serve(&handler, "/", None);
    assert_eq!(body(&rsp), "<html><p>hi</p><aside>n</aside></html>");
}

#[test]
fn include_inside_the_partial_renders_once() {
    let mut graph = ViewGraph::new();
    let base = graph.new_view(
        "base.html",
        Handler::new(|rsp, req| json!({ "content": rsp.handle_sub_view("content", req) })),
    );
    let page = graph.default_sub_view(
        base,
        "content",
        "page.html",
        Handler::new(|rsp, req| json!({ "side": rsp.handle_sub_view("side", req) })),
    );
    graph.default_sub_view(page, "side", "side.html", constant(json!("default")));
    let extra = graph.sub_view(page, "side", "side.html", constant(json!("included")));

    let source: KeyedStrings = [
        ("base.html", r#"<html>{{ block("content", data.content) }}</html>"#),
        ("page.html", r#"<div>{{ block("side", data.side) }}</div>"#),
        ("side.html", "<i>{{ data }}</i>"),
    ]
    .into_iter()
    .collect();
    let executor = Executor::new(source);
    let handler = executor.view_handler_with_includes(&graph, page, &[extra]);
    assert!(executor.flush_errors().is_empty());
    assert_eq!(handler.includes().count(), 0);

    let rsp = serve(&handler, "/", Some(FRAGMENT_CONTENT_TYPE));
    assert_eq!(body(&rsp), "<div><i>included</i></div>");
}

#[test]
fn nested_status_reaches_the_response() {
    let mut graph = ViewGraph::new();
    let root = graph.new_view(
        "r.html",
        Handler::new(|rsp, req| json!({ "content": rsp.handle_sub_view("content", req) })),
    );
    let c = graph.default_sub_view(
        root,
        "content",
        "c.html",
        Handler::new(|rsp, req| {
            rsp.handle_sub_view("inner", req);
            json!("c")
        }),
    );
    graph.default_sub_view(
        c,
        "inner",
        "i.html",
        Handler::new(|rsp, _| {
            rsp.status(StatusCode::NOT_IMPLEMENTED);
            json!(null)
        }),
    );
    let source: KeyedStrings = [
        ("r.html", r#"{{ block("content", data.content) }}"#),
        ("c.html", r#"{{ data }}{{ block("inner") }}"#),
        ("i.html", "!"),
    ]
    .into_iter()
    .collect();
    let handler = Executor::new(source).view_handler(&graph, c);

    let rsp = serve(&handler, "/", None);
    assert_eq!(rsp.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body(&rsp), "c!");
}

fn redirecting_site(parent_saw: Arc<AtomicBool>) -> (ViewGraph, ViewId) {
    let mut graph = ViewGraph::new();
    let root = graph.new_view(
        "r.html",
        Handler::new(move |rsp, req| {
            let content = rsp.handle_sub_view("content", req);
            parent_saw.store(content.is_none() && rsp.finished(), Ordering::SeqCst);
            json!({ "content": content })
        }),
    );
    let leaf = graph.default_sub_view(
        root,
        "content",
        "c.html",
        Handler::new(|rsp, req| {
            redirect(rsp, req, "/login", StatusCode::SEE_OTHER).unwrap();
            json!("ignored")
        }),
    );
    (graph, leaf)
}

#[test]
fn redirect_replaces_page_output() {
    let saw = Arc::new(AtomicBool::new(false));
    let (graph, leaf) = redirecting_site(saw.clone());
    let source: KeyedStrings = [
        ("r.html", r#"<html>{{ block("content", data.content) }}</html>"#),
        ("c.html", "{{ data }}"),
    ]
    .into_iter()
    .collect();
    let handler = Executor::new(source).view_handler(&graph, leaf);

    let rsp = serve(&handler, "/", None);
    assert_eq!(rsp.status(), StatusCode::SEE_OTHER);
    assert_eq!(rsp.headers()[LOCATION], "/login");
    assert_eq!(rsp.headers()[VARY], "Accept");
    assert!(rsp.body().is_empty());
    assert!(saw.load(Ordering::SeqCst));

    let rsp = serve(&handler, "/", Some(PARTIAL_CONTENT_TYPE));
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(rsp.headers()[REDIRECT_HEADER], "/login");
    assert!(rsp.headers().get(LOCATION).is_none());
    assert_eq!(rsp.headers()[VARY], "Accept");
    assert!(rsp.body().is_empty());
}

#[test]
fn taken_over_response_varies_on_accept() {
    let mut graph = ViewGraph::new();
    let view = graph.new_view(
        "v.html",
        Handler::new(|rsp, _| {
            rsp.respond(http::Response::new(Bytes::from_static(b"raw")));
            json!(null)
        }),
    );
    let source: KeyedStrings = [("v.html", "v")].into_iter().collect();
    let handler = Executor::new(source).view_handler(&graph, view);

    for accept in [None, Some(PARTIAL_CONTENT_TYPE)] {
        let rsp = serve(&handler, "/", accept);
        assert_eq!(body(&rsp), "raw");
        assert_eq!(rsp.headers()[VARY], "Accept");
    }
}

#[test]
fn cancellation_fires_after_redirect() {
    let token = Arc::new(Mutex::new(None));
    let mut graph = ViewGraph::new();
    let record = token.clone();
    let view = graph.new_view(
        "v.html",
        Handler::new(move |rsp, req| {
            *record.lock().unwrap() = Some(rsp.cancellation().clone());
            redirect(rsp, req, "/elsewhere", StatusCode::FOUND).unwrap();
            json!(null)
        }),
    );
    let source: KeyedStrings = [("v.html", "v")].into_iter().collect();
    let handler = Executor::new(source).view_handler(&graph, view);

    let rsp = serve(&handler, "/", None);
    assert_eq!(rsp.status(), StatusCode::FOUND);
    let token = token.lock().unwrap().take().unwrap();
    assert!(token.is_cancelled());
}

#[test]
fn broken_page_templates_leave_partials_working() {
    let s = site();
    let mut source = templates();
    source.insert(
        "base.html",
        r#"<html>{{ block("content", data.content) }}{{ block("notice", data.notice) }}{% if %}</html>"#,
    );
    let executor = Executor::new(source);
    let handler = executor.view_handler(&s.graph, s.home);

    let errors = executor.flush_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0].error, TemplateError::Syntax { key, .. } if key == "base.html"));
    assert!(executor.flush_errors().is_empty());

    assert_eq!(serve(&handler, "/", None).status(), StatusCode::NOT_ACCEPTABLE);
    let rsp = serve(&handler, "/", Some(PARTIAL_CONTENT_TYPE));
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(body(&rsp), "<p>hi</p>");
}

#[test]
fn missing_slot_is_a_construction_error() {
    let s = site();
    let mut source = templates();
    source.insert("base.html", r#"<html>{{ block("content", data.content) }}</html>"#);
    let executor = Executor::new(source);
    executor.view_handler(&s.graph, s.home);

    let errors = executor.flush_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0].error, TemplateError::MissingSlot { block, .. } if block == "notice"));
    assert_eq!(errors[0].node.template(), "base.html");
}

#[test]
fn render_failure_is_a_clean_500() {
    let s = site();
    let mut source = templates();
    source.insert("home.html", "<p>{{ no_such_function() }}</p>");
    let executor = Executor::new(source);
    let handler = executor.view_handler(&s.graph, s.home);
    assert!(executor.flush_errors().is_empty());

    let rsp = serve(&handler, "/", None);
    assert_eq!(rsp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(&rsp), "Internal Server Error");
}

#[test]
fn developer_mode_reloads_templates() {
    let s = site();
    let shared = Arc::new(RwLock::new(templates()));
    shared.write().unwrap().insert("home.html", "{% if %}");
    let reader = shared.clone();
    let source = move |key: &str| -> Result<String, TemplateError> { reader.read().unwrap().load(key) };

    let executor = Executor::developer(source);
    let handler = executor.view_handler(&s.graph, s.home);
    assert!(executor.flush_errors().is_empty());

    let rsp = serve(&handler, "/", None);
    assert_eq!(rsp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body(&rsp).contains("<h1>Template errors</h1>"));
    assert!(body(&rsp).contains("home.html"));

    shared.write().unwrap().insert("home.html", "<p>fixed {{ data.msg }}</p>");
    let rsp = serve(&handler, "/", None);
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(body(&rsp), "<html><p>fixed hi</p></html>");
}

#[test]
fn page_url_overrides_apply_to_partials() {
    let mut graph = ViewGraph::new();
    let view = graph.new_view(
        "v.html",
        Handler::new(|rsp, _| {
            rsp.replace_page_url("/canonical");
            json!(null)
        }),
    );
    let source: KeyedStrings = [("v.html", "v")].into_iter().collect();
    let handler = Executor::new(source).view_handler(&graph, view);

    let rsp = serve(&handler, "/v?tmp=1", Some(PARTIAL_CONTENT_TYPE));
    assert_eq!(rsp.headers()[RESPONSE_URL_HEADER], "/canonical");
    assert_eq!(rsp.headers()[RESPONSE_HISTORY_HEADER], "replace");

    let rsp = serve(&handler, "/v?tmp=1", Some(FRAGMENT_CONTENT_TYPE));
    assert_eq!(rsp.headers()[RESPONSE_URL_HEADER], "/v?tmp=1");
    assert!(rsp.headers().get(RESPONSE_HISTORY_HEADER).is_none());
}

#[test]
fn cancellation_fires_and_ids_increase() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut graph = ViewGraph::new();
    let record = seen.clone();
    let view = graph.new_view(
        "v.html",
        Handler::new(move |rsp, _| {
            record
                .lock()
                .unwrap()
                .push((rsp.response_id(), rsp.cancellation().clone()));
            json!(null)
        }),
    );
    let source: KeyedStrings = [("v.html", "v")].into_iter().collect();
    let handler = Executor::new(source).view_handler(&graph, view);

    serve(&handler, "/", None);
    serve(&handler, "/", None);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0 < seen[1].0);
    assert!(seen.iter().all(|(_, token)| token.is_cancelled()));
}
