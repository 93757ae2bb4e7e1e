//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use mercator_frontier::config::{
    Config, CrawlerConfig, FetcherConfig, SchedulerConfig, UserAgentConfig,
};
use mercator_frontier::crawler::{run_crawl, DataFetcher, MetaFetcher};
use mercator_frontier::{host_of, CrawlError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Creates a test configuration with the given seeds
fn create_test_config(seeds: Vec<String>) -> Config {
    Config {
        scheduler: SchedulerConfig {
            politeness_interval: 10, // Very short for testing
            poll_interval: 1,
        },
        user_agent: create_user_agent(),
        fetcher: FetcherConfig {
            timeout: 5,
            connect_timeout: 5,
        },
        crawler: CrawlerConfig {
            max_pages: 0,
            follow_links: true,
            seeds,
        },
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

/// Mounts `/` linking to `/page1` and `/page2`, which link back to `/`
async fn mount_small_site(mock_server: &MockServer) {
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/page2#again">Page 2 again</a>
            <a href="mailto:test@example.com">Mail</a>
            </body></html>"#,
            base_url
        )))
        .expect(1)
        .mount(mock_server)
        .await;

    for page in ["page1", "page2"] {
        Mock::given(method("GET"))
            .and(path(format!("/{}", page)))
            .respond_with(html(format!(
                r#"<html><head><title>{}</title></head><body><a href="/">Home</a></body></html>"#,
                page
            )))
            .expect(1)
            .mount(mock_server)
            .await;
    }
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;

    let config = create_test_config(vec![format!("{}/", mock_server.uri())]);
    let stats = run_crawl(&config).await.expect("Crawl failed");

    // Each page is fetched exactly once even though `/` is linked twice
    assert_eq!(stats.fetched, 3);
    assert_eq!(stats.failed, 0);

    let host = host_of(&mock_server.uri()).unwrap();
    assert_eq!(stats.pages_by_host.get(&host), Some(&3));
    assert!(stats.finished_at.is_some());
}

#[tokio::test]
async fn test_max_pages_limits_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/next">Next</a></body></html>"#.to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("<html></html>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", mock_server.uri())]);
    config.crawler.max_pages = 1;

    let stats = run_crawl(&config).await.expect("Crawl failed");
    assert_eq!(stats.total(), 1);
}

#[tokio::test]
async fn test_follow_links_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/elsewhere">Elsewhere</a></body></html>"#.to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", mock_server.uri())]);
    config.crawler.follow_links = false;

    let stats = run_crawl(&config).await.expect("Crawl failed");
    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_dead_links_counted_as_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/missing">Missing</a></body></html>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;

    // Unmatched requests get a 404 from wiremock
    let config = create_test_config(vec![format!("{}/", mock_server.uri())]);
    let stats = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_meta_fetcher_extracts_metadata() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(
            r#"<html><head>
            <title>An Article</title>
            <meta name="description" content="About things">
            <link rel="canonical" href="/articles/1">
            </head><body>
            <a href="/about">About</a>
            <a href="javascript:void(0)">Nothing</a>
            <a href="https://other.example/">Elsewhere</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let fetcher = MetaFetcher::new(&create_user_agent(), &FetcherConfig::default()).unwrap();
    let url = format!("{}/article", mock_server.uri());
    let meta = fetcher.fetch(&url).await.expect("Fetch failed");

    assert_eq!(meta.url, url);
    assert_eq!(meta.final_url, url);
    assert_eq!(meta.status, 200);
    assert_eq!(meta.title.as_deref(), Some("An Article"));
    assert_eq!(meta.description.as_deref(), Some("About things"));
    assert_eq!(
        meta.canonical,
        Some(format!("{}/articles/1", mock_server.uri()))
    );
    assert_eq!(
        meta.links,
        vec![
            format!("{}/about", mock_server.uri()),
            "https://other.example/".to_string(),
            format!("{}/articles/1", mock_server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_meta_fetcher_sends_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(html("<html></html>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = MetaFetcher::new(&create_user_agent(), &FetcherConfig::default()).unwrap();
    let meta = fetcher.fetch(&format!("{}/", mock_server.uri())).await;
    assert!(meta.is_ok());
}

#[tokio::test]
async fn test_meta_fetcher_maps_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let fetcher = MetaFetcher::new(&create_user_agent(), &FetcherConfig::default()).unwrap();
    let url = format!("{}/gone", mock_server.uri());

    assert_eq!(
        fetcher.fetch(&url).await,
        Err(CrawlError::Status { url, status: 410 })
    );
}

#[tokio::test]
async fn test_meta_fetcher_skips_non_html() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"href": "/not-a-link"}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = MetaFetcher::new(&create_user_agent(), &FetcherConfig::default()).unwrap();
    let meta = fetcher
        .fetch(&format!("{}/data.json", mock_server.uri()))
        .await
        .expect("Fetch failed");

    assert_eq!(meta.content_type.as_deref(), Some("application/json"));
    assert_eq!(meta.title, None);
    assert!(meta.links.is_empty());
}
