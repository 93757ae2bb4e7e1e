//! Data fetchers
//!
//! The orchestrator is generic over what "fetching" a URL means. This module
//! contains:
//! - The [`DataFetcher`] interface
//! - [`FnFetcher`], which adapts an async closure
//! - [`MetaFetcher`], the default fetcher that retrieves a page over HTTP
//!   and extracts its metadata

use super::parser::parse_page;
use crate::config::{FetcherConfig, UserAgentConfig};
use crate::url::Link;
use crate::CrawlError;
use reqwest::{header::CONTENT_TYPE, Client};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Produces the data associated with a URL
///
/// Outputs are shared between every caller attached to the same in-flight
/// fetch, so they must be cheap enough to clone.
pub trait DataFetcher: Send + Sync + Clone + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn fetch(&self, url: &str) -> impl Future<Output = Result<Self::Output, CrawlError>> + Send;
}

/// Adapts an async closure into a [`DataFetcher`]
///
/// # Example
///
/// ```
/// use mercator_frontier::crawler::FnFetcher;
/// use mercator_frontier::CrawlError;
///
/// let fetcher = FnFetcher::new(|url: String| async move { Ok::<_, CrawlError>(url.len()) });
/// ```
#[derive(Clone)]
pub struct FnFetcher<F> {
    f: F,
}

impl<F> FnFetcher<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

impl<F, Fut, T> DataFetcher for FnFetcher<F>
where
    F: Fn(Link) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<T, CrawlError>> + Send,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn fetch(&self, url: &str) -> impl Future<Output = Result<T, CrawlError>> + Send {
        (self.f)(url.to_string())
    }
}

/// Metadata extracted from a fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// The URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    /// Outgoing http(s) links; empty for non-HTML responses
    pub links: Vec<String>,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use mercator_frontier::config::{FetcherConfig, UserAgentConfig};
/// use mercator_frontier::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "MercatorBot".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    config: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(config.timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Default fetcher: GETs the page and extracts its metadata
///
/// # Error Mapping
///
/// | Condition | Error |
/// |-----------|-------|
/// | Unparseable URL | [`CrawlError::InvalidUrl`] |
/// | Transport failure or timeout | [`CrawlError::Request`] |
/// | Non-2xx status | [`CrawlError::Status`] |
///
/// Failures are not retried.
#[derive(Debug, Clone)]
pub struct MetaFetcher {
    client: Client,
}

impl MetaFetcher {
    pub fn new(user_agent: &UserAgentConfig, config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(user_agent, config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl DataFetcher for MetaFetcher {
    type Output = PageMeta;

    async fn fetch(&self, url: &str) -> Result<PageMeta, CrawlError> {
        let parsed = Url::parse(url).map_err(|e| CrawlError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut meta = PageMeta {
            url: url.to_string(),
            final_url: final_url.to_string(),
            status: status.as_u16(),
            content_type: content_type.clone(),
            ..PageMeta::default()
        };

        let is_html = content_type
            .as_deref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);
        if !is_html {
            tracing::debug!("Skipping metadata for {} ({:?})", url, content_type);
            return Ok(meta);
        }

        let body = response.text().await.map_err(|e| request_error(url, &e))?;
        let page = parse_page(&body, &final_url);
        meta.title = page.title;
        meta.description = page.description;
        meta.canonical = page.canonical;
        meta.links = page.links;

        tracing::debug!("Fetched {} ({} links)", url, meta.links.len());
        Ok(meta)
    }
}

fn request_error(url: &str, err: &reqwest::Error) -> CrawlError {
    // Classify error
    let message = if err.is_timeout() {
        "Request timeout".to_string()
    } else if err.is_connect() {
        "Connection refused".to_string()
    } else {
        err.to_string()
    };
    CrawlError::Request {
        url: url.to_string(),
        message,
    }
}
