//! Crawler pipeline built on top of the frontier
//!
//! This module contains:
//! - Single-flight deduplication of concurrent requests
//! - The orchestrator that drains the frontier into fetches
//! - Pluggable data fetchers, including an HTTP metadata fetcher
//! - HTML metadata and link extraction
//! - Crawl statistics
//! - The config-driven crawl loop used by the CLI

mod coordinator;
mod dedup;
mod fetcher;
mod orchestrator;
mod parser;
mod stats;

pub use coordinator::run_crawl;
pub use dedup::{Pending, RequestDeduplicator};
pub use fetcher::{build_http_client, DataFetcher, FnFetcher, MetaFetcher, PageMeta};
pub use orchestrator::{Orchestrator, PendingFetch};
pub use parser::{parse_page, ParsedPage};
pub use stats::CrawlStats;
