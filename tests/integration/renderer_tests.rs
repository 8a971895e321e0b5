//! HTTP renderer tests
//!
//! These tests use wiremock to stand in for the preview server and run the
//! full export cycle over real HTTP.

use crate::common::{output_dir, read_tree, test_config};
use static_export::config::RendererConfig;
use static_export::crawler::{export, HttpRenderer, Render, RenderError, DYNAMIC_HEADER};
use static_export::output::BuildWarning;
use static_export::RoutePath;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn renderer_for(server: &MockServer) -> HttpRenderer {
    let config = RendererConfig {
        origin: server.uri(),
        ..RendererConfig::default()
    };
    HttpRenderer::new(&config, Duration::from_secs(5)).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_renders_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<h1>About</h1>"))
        .mount(&server)
        .await;

    let response = renderer_for(&server)
        .render(&RoutePath::parse("/about").unwrap())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_deref(), Some(&b"<h1>About</h1>"[..]));
    assert!(response.content_type.unwrap().starts_with("text/html"));
    assert!(!response.requires_server);
}

#[tokio::test]
async fn test_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "export-bot/1.0"))
        .respond_with(html("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let config = RendererConfig {
        origin: server.uri(),
        user_agent: "export-bot/1.0".to_string(),
    };
    let renderer = HttpRenderer::new(&config, Duration::from_secs(5)).unwrap();
    let response = renderer.render(&RoutePath::root()).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;

    let response = renderer_for(&server)
        .render(&RoutePath::parse("/old").unwrap())
        .await
        .unwrap();

    assert_eq!(response.status, 301);
    assert_eq!(response.redirect_target.as_deref(), Some("/new"));
    assert!(response.body.is_none());
}

#[tokio::test]
async fn test_dynamic_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(html("").insert_header(DYNAMIC_HEADER, "dynamic"))
        .mount(&server)
        .await;

    let response = renderer_for(&server)
        .render(&RoutePath::parse("/account").unwrap())
        .await
        .unwrap();
    assert!(response.requires_server);
}

#[tokio::test]
async fn test_server_error_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let response = renderer_for(&server).render(&RoutePath::root()).await.unwrap();
    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    // Bind and release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = RendererConfig {
        origin: format!("http://{}", addr),
        ..RendererConfig::default()
    };
    let renderer = HttpRenderer::new(&config, Duration::from_secs(5)).unwrap();

    let err = renderer.render(&RoutePath::root()).await.unwrap_err();
    assert!(matches!(err, RenderError::Io(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_full_export_over_http() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><head><link rel="stylesheet" href="/app.css"></head><body>
            <a href="/blog/">Blog</a>
            <a href="{}/about">About</a>
            <a href="https://elsewhere.example/">Elsewhere</a>
            </body></html>"#,
            base_url
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blog/"))
        .respond_with(html(r#"<a href="first-post">First</a><a href="/">Home</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blog/first-post"))
        .respond_with(html("<article>Hello</article>"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(308).insert_header("location", "/about/"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about/"))
        .respond_with(html("<p>About us</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, &["/"]);
    config.renderer.origin = base_url;
    config.export.render_timeout_ms = 5_000;

    let outcome = export(config).await.unwrap();
    assert!(outcome.success, "errors: {:?}", outcome.errors);
    assert!(outcome
        .warnings
        .iter()
        .all(|w| !matches!(w, BuildWarning::RenderFailed { .. })));

    let tree = read_tree(&output_dir(&dir));
    let paths: Vec<_> = tree.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec![
            "200.html",
            "about/index.html",
            "blog/first-post/index.html",
            "blog/index.html",
            "index.html",
        ]
    );
    assert_eq!(outcome.redirects.len(), 1);
}
