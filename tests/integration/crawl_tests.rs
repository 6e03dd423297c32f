//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the real
//! HTTP fetcher and the full pipeline against them. The crawler is blocking
//! code, so it always runs inside `spawn_blocking`.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tidemark::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use tidemark::crawler::{crawl, Fetch, HttpFetcher};
use tidemark::output::PipelineSnapshot;
use tidemark::robots::{RobotsPolicy, RobotsStatus};
use tidemark::url::UrlRef;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FULL_USER_AGENT: &str = "TestBot/1.0.0 (+https://example.com/contact; test@example.com)";

/// Creates a small, fast test configuration
fn create_test_config(metrics_path: Option<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            fetchers: 2,
            parsers: 1,
            byte_budget: 1 << 20,
            fetch_timeout_secs: 5,
            robots_timeout_secs: 5,
            pop_timeout_ms: 10,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            metrics_path,
            metrics_interval_secs: 1,
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body).into_bytes(),
        "text/html",
    )
}

async fn mount_robots(server: &MockServer, body: &'static str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain"))
        .expect(1)
        .mount(server)
        .await;
}

/// Runs a full crawl from one seed on the blocking pool
async fn run_crawl(config: Config, seed: String) -> PipelineSnapshot {
    tokio::task::spawn_blocking(move || {
        let fetcher = HttpFetcher::new().expect("Failed to build HTTP client");
        let seeds = vec![UrlRef::try_parse(&seed).expect("Bad seed")];
        crawl(config, &seeds, Arc::new(fetcher)).expect("Crawl failed")
    })
    .await
    .expect("Crawl task panicked")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetcher_sends_user_agent_and_reports_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", FULL_USER_AGENT))
        .respond_with(html("<p>Hello</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/page", mock_server.uri());
    let response = tokio::task::spawn_blocking(move || {
        let fetcher = HttpFetcher::new().unwrap();
        fetcher.fetch(&url, Duration::from_secs(5), FULL_USER_AGENT)
    })
    .await
    .unwrap()
    .expect("Fetch failed");

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert!(String::from_utf8_lossy(&response.body).contains("Hello"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetcher_follows_redirects() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html("moved"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/old", base_url);
    let response = tokio::task::spawn_blocking(move || {
        HttpFetcher::new()
            .unwrap()
            .fetch(&url, Duration::from_secs(5), FULL_USER_AGENT)
    })
    .await
    .unwrap()
    .expect("Fetch failed");

    assert_eq!(response.status, 200);
    assert_eq!(response.effective_url, format!("{}/new", base_url));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetcher_drops_non_text_bodies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/image.png", mock_server.uri());
    let response = tokio::task::spawn_blocking(move || {
        HttpFetcher::new()
            .unwrap()
            .fetch(&url, Duration::from_secs(5), FULL_USER_AGENT)
    })
    .await
    .unwrap()
    .expect("Fetch failed");

    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_robots_policy_initializes_from_server() {
    let mock_server = MockServer::start().await;
    mount_robots(
        &mock_server,
        "User-agent: OtherBot\nDisallow: /\n\nUser-agent: TestBot\nDisallow: /admin/\nAllow: /admin/public\n",
    )
    .await;

    let base_url = mock_server.uri();
    let policy = tokio::task::spawn_blocking(move || {
        let fetcher = HttpFetcher::new().unwrap();
        let policy = RobotsPolicy::for_url(
            &UrlRef::parse(&format!("{}/", base_url)),
            "TestBot",
            FULL_USER_AGENT,
        )
        .unwrap();
        policy.initialize(&fetcher, Duration::from_secs(5));
        policy
    })
    .await
    .unwrap();

    let base_url = mock_server.uri();
    let allowed = |p: &str| policy.is_allowed(&UrlRef::parse(&format!("{}{}", base_url, p)));

    assert_eq!(policy.status(), RobotsStatus::Rules);
    assert!(allowed("/"));
    assert!(!allowed("/admin/users"));
    assert!(allowed("/admin/public/page"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_robots_allows_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/about">About</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("About us"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = run_crawl(create_test_config(None), format!("{}/", mock_server.uri())).await;

    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.discarded, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_crawl_respects_robots() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, "User-agent: *\nDisallow: /private/\n").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<a href="/private/x">Secret</a>
               <a href="/public/y">Public</a>
               <a href="../../escape">Escape</a>
               <a href="{}/public/y#section">Again</a>
               <a href="mailto:someone@example.com">Mail</a>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/y"))
        .respond_with(html(r#"<a href="/">Home</a><a href="../escape">Up</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/escape"))
        .respond_with(html("Out"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/x"))
        .respond_with(html("Should never be fetched"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let metrics_path = temp_dir.path().join("metrics.log");
    let config = create_test_config(Some(metrics_path.to_string_lossy().into_owned()));

    let summary = run_crawl(config, format!("{}/", base_url)).await;

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.parsed, 3);
    assert_eq!(summary.admitted, 3);
    assert_eq!(summary.discarded, 1);
    assert_eq!(summary.bytes_held, 0);

    let metrics = std::fs::read_to_string(&metrics_path).unwrap();
    let mut lines = metrics.lines();
    assert!(lines.next().unwrap().starts_with("# time"));
    assert!(lines.next().is_some(), "Expected at least one metrics record");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_pages_are_not_retried() {
    let mock_server = MockServer::start().await;

    mount_robots(&mock_server, "User-agent: *\nAllow: /\n").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/broken">Broken</a><a href="/gone">Gone</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_raw(
            r#"<a href="/from-error-page">x</a>"#,
            "text/html",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/from-error-page"))
        .respond_with(html("unreachable"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let summary = run_crawl(create_test_config(None), format!("{}/", mock_server.uri())).await;

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.visited, 3);
    assert_eq!(summary.bytes_held, 0);
}
