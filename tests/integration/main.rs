//! Integration tests for Mercator
//!
//! - `crawl_tests`: wiremock-backed fetcher and crawl loop tests
//! - `orchestrator_tests`: deduplication and pull-pipeline behavior under
//!   paused Tokio time

mod crawl_tests;
mod orchestrator_tests;
