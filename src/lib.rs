//! Mercator Frontier: the scheduling and deduplication core of a polite crawler
//!
//! This crate implements the back half of a Mercator-style URL frontier: a
//! per-host readiness scheduler that enforces politeness, a back-queue
//! selector that pairs a ready host with its next queued URL, and an
//! orchestrator that collapses concurrent admission and fetch requests for
//! the same URL into a single in-flight operation.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod url;

use thiserror::Error;

/// Main error type for Mercator operations
#[derive(Debug, Error)]
pub enum MercatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by admission and fetch operations
///
/// These are handed to every caller attached to the same in-flight
/// operation, so the type is `Clone` and carries rendered messages rather
/// than the underlying error values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Operation for {url} was aborted before it settled")]
    Aborted { url: String },

    #[error("Frontier closed before {url} became ready")]
    FrontierClosed { url: String },
}

impl CrawlError {
    /// Returns the URL the error refers to
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url, .. }
            | Self::Request { url, .. }
            | Self::Status { url, .. }
            | Self::Parse { url, .. }
            | Self::Aborted { url }
            | Self::FrontierClosed { url } => url,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

impl From<UrlError> for CrawlError {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::Parse { url, reason } => CrawlError::InvalidUrl { url, reason },
            UrlError::MissingHost(url) => CrawlError::InvalidUrl {
                url,
                reason: "URL has no host".to_string(),
            },
        }
    }
}

/// Result type alias for Mercator operations
pub type Result<T> = std::result::Result<T, MercatorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{DataFetcher, Orchestrator, RequestDeduplicator};
pub use frontier::{Frontier, HostHeap, UrlFrontier};
pub use crate::url::{host_of, Host, Link};
