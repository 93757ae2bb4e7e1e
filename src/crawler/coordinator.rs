//! Config-driven crawl loop
//!
//! Builds an [`Orchestrator`] over a [`UrlFrontier`] and a [`MetaFetcher`],
//! seeds it, and drains it while feeding discovered links back into the
//! frontier.

use super::fetcher::MetaFetcher;
use super::orchestrator::Orchestrator;
use super::stats::CrawlStats;
use crate::config::Config;
use crate::frontier::{Frontier, UrlFrontier};
use crate::MercatorError;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This will:
/// 1. Build the HTTP client
/// 2. Queue the configured seeds
/// 3. Fetch ready URLs under the politeness interval
/// 4. Queue newly discovered links (when `follow-links` is set)
/// 5. Stop at frontier exhaustion or after `max-pages` fetches
///
/// Every URL is queued at most once per run.
pub async fn run_crawl(config: &Config) -> Result<CrawlStats, MercatorError> {
    let fetcher = MetaFetcher::new(&config.user_agent, &config.fetcher)?;
    let frontier = Arc::new(UrlFrontier::new(config.scheduler));
    let orchestrator = Orchestrator::with_shared_frontier(Arc::clone(&frontier), fetcher);

    let mut seen = HashSet::new();
    for seed in &config.crawler.seeds {
        if seen.insert(seed.clone()) {
            frontier.enqueue(seed)?;
        }
    }
    tracing::info!(
        "Starting crawl with {} seeds across {} hosts",
        frontier.queued_len(),
        frontier.host_count()
    );

    let max_pages = config.crawler.max_pages;
    let follow_links = config.crawler.follow_links;
    let mut settled = 0u64;

    let stats = orchestrator
        .crawl(|url, outcome| {
            settled += 1;

            if let Ok(page) = outcome {
                tracing::info!(
                    "[{}] {} {}",
                    page.status,
                    url,
                    page.title.as_deref().unwrap_or("(untitled)")
                );

                if follow_links {
                    let mut discovered = 0;
                    for link in &page.links {
                        if !seen.insert(link.clone()) {
                            continue;
                        }
                        match frontier.enqueue(link) {
                            Ok(()) => discovered += 1,
                            Err(e) => tracing::debug!("Skipping link {}: {}", link, e),
                        }
                    }
                    tracing::debug!("Queued {} new links from {}", discovered, url);
                }
            }

            if max_pages > 0 && settled >= max_pages {
                tracing::info!("Reached max pages ({})", max_pages);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await;

    if frontier.queued_len() > 0 {
        tracing::info!("{} URLs left unvisited", frontier.queued_len());
    }

    Ok(stats)
}
