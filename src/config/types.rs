use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Mercator
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
}

/// Host readiness scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Minimum time between two fetches from the same host (milliseconds)
    #[serde(rename = "politeness-interval", default = "default_politeness_interval")]
    pub politeness_interval: u64,

    /// Granularity of the wait for a host's politeness window (milliseconds)
    #[serde(rename = "poll-interval", default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl SchedulerConfig {
    pub fn politeness(&self) -> Duration {
        Duration::from_millis(self.politeness_interval)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            politeness_interval: default_politeness_interval(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_politeness_interval() -> u64 {
    2000
}

fn default_poll_interval() -> u64 {
    50
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FetcherConfig {
    /// Total request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Stop after this many fetched pages (0 = until the frontier is exhausted)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u64,

    /// Whether links discovered on fetched pages are fed back into the frontier
    #[serde(rename = "follow-links", default = "default_follow_links")]
    pub follow_links: bool,

    /// Seed URLs admitted when the crawl starts
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 0,
            follow_links: default_follow_links(),
            seeds: Vec::new(),
        }
    }
}

fn default_follow_links() -> bool {
    true
}
