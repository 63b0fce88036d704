//! Integration tests for the reqwest-backed fetcher
//!
//! These tests use wiremock to create mock HTTP servers and drive both the
//! fetcher on its own and a full session through it.

use std::time::Duration;
use sumi_stream::config::Config;
use sumi_stream::crawler::{Fetcher, HttpFetcher, SessionRegistry};
use sumi_stream::{FetchError, SessionState};
use tokio_stream::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short timeouts and backoff
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.request_timeout_ms = 500;
    config.crawler.connect_timeout_ms = 500;
    config.backoff.initial_delay_ms = 1;
    config.backoff.min_delay_ms = 1;
    config.backoff.max_delay_ms = 20;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_extracts_absolute_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html(
            r##"<a href="/page1">Page 1</a>
            <a href="page2">Page 2</a>
            <a href="#top">Top</a>
            <a href="mailto:someone@example.com">Mail</a>
            <a href="https://other.test/x">Elsewhere</a>"##,
        ),
    )
    .await;

    let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
    let page = fetcher.fetch(&format!("{}/", base_url)).await.unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(
        page.links,
        vec![
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
            "https://other.test/x".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_fetch_reports_error_status() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/missing", ResponseTemplate::new(404)).await;

    let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_fetch_rejects_non_html() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw(r#"{"a": 1}"#, "application/json"),
    )
    .await;

    let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/data.json", mock_server.uri()))
        .await
        .unwrap_err();

    match err {
        FetchError::NotHtml { content_type, .. } => {
            assert!(content_type.starts_with("application/json"))
        }
        other => panic!("expected NotHtml, got {:?}", other),
    }
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/docs/new"),
    )
    .await;
    mount_page(&mock_server, "/docs/new", html(r#"<a href="child">Child</a>"#)).await;

    let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
    let page = fetcher.fetch(&format!("{}/old", base_url)).await.unwrap();

    assert_eq!(page.links, vec![format!("{}/docs/child", base_url)]);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/slow",
        html("slow").set_delay(Duration::from_secs(3)),
    )
    .await;

    let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/slow", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
    let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::Transport { .. } | FetchError::Timeout { .. }
    ));
    assert_eq!(err.url(), "http://127.0.0.1:1/");
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html(
            r#"<a href="/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="https://other.test/">Other</a>"#,
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        html(r#"<a href="/">Home</a><a href="/page3">Page 3</a>"#),
    )
    .await;
    mount_page(&mock_server, "/page2", ResponseTemplate::new(500)).await;
    mount_page(&mock_server, "/page3", html("leaf")).await;

    let registry = SessionRegistry::with_http_fetcher(create_test_config()).unwrap();

    let key = registry.create(&base_url, 1).unwrap();
    let session = registry.get(&key).unwrap();
    let events: Vec<_> = tokio::time::timeout(
        Duration::from_secs(10),
        session.subscribe().unwrap().collect::<Vec<_>>(),
    )
    .await
    .expect("crawl should finish");

    let mut visited: Vec<_> = events.iter().map(|e| e.url.clone()).collect();
    visited.sort();
    assert_eq!(visited, vec![format!("{}/", base_url), format!("{}/page1", base_url)]);

    let root = events.iter().find(|e| e.depth == 0).unwrap();
    assert_eq!(
        root.links,
        vec![format!("{}/page1", base_url), format!("{}/page2", base_url)]
    );

    session.wait_terminated().await;
    assert_eq!(session.state(), SessionState::Terminated);
    let stats = session.stats();
    assert_eq!(stats.pages_visited, 2);
    assert_eq!(stats.fetch_failures, 1);
}
