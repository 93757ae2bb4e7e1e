//! Crawl orchestration
//!
//! The [`Orchestrator`] wires a [`Frontier`] and a [`DataFetcher`] into one
//! pipeline. Each URL moves through admission, politeness wait, and fetch.
//! A duplicate request made while the URL is being admitted or fetched
//! attaches to the operation already in flight.

use super::dedup::{Pending, RequestDeduplicator};
use super::fetcher::DataFetcher;
use super::stats::CrawlStats;
use crate::frontier::Frontier;
use crate::url::{host_of, Link};
use crate::CrawlError;
use futures::stream::{self, Stream, StreamExt};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Shared handle to one deduplicated fetch outcome
pub type PendingFetch<T> = Pending<Result<T, CrawlError>>;

struct Inner<F, D: DataFetcher> {
    frontier: Arc<F>,
    fetcher: D,
    /// Admit-then-fetch operations keyed by URL
    admissions: RequestDeduplicator<Result<D::Output, CrawlError>>,
    /// Fetch operations keyed by URL
    fetches: RequestDeduplicator<Result<D::Output, CrawlError>>,
}

/// Drives a frontier and a fetcher as a single pull-based pipeline
///
/// Clones share the same frontier and deduplication tables.
///
/// # Example
///
/// ```no_run
/// use mercator_frontier::config::SchedulerConfig;
/// use mercator_frontier::crawler::{FnFetcher, Orchestrator};
/// use mercator_frontier::{CrawlError, UrlFrontier};
///
/// # async fn run() {
/// let frontier = UrlFrontier::new(SchedulerConfig::default());
/// let fetcher = FnFetcher::new(|url: String| async move { Ok::<_, CrawlError>(url.len()) });
/// let orchestrator = Orchestrator::new(frontier, fetcher);
///
/// let length = orchestrator.send_url("https://example.com/").await;
/// assert_eq!(length, Ok(20));
/// # }
/// ```
pub struct Orchestrator<F, D: DataFetcher> {
    inner: Arc<Inner<F, D>>,
}

impl<F, D: DataFetcher> Clone for Orchestrator<F, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F, D: DataFetcher + fmt::Debug> fmt::Debug for Orchestrator<F, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("fetcher", &self.inner.fetcher)
            .field("admissions", &self.inner.admissions)
            .field("fetches", &self.inner.fetches)
            .finish_non_exhaustive()
    }
}

fn aborted<T>(url: &str) -> Result<T, CrawlError> {
    Err(CrawlError::Aborted {
        url: url.to_string(),
    })
}

impl<F, D> Orchestrator<F, D>
where
    F: Frontier,
    D: DataFetcher,
{
    pub fn new(frontier: F, fetcher: D) -> Self {
        Self::with_shared_frontier(Arc::new(frontier), fetcher)
    }

    /// Builds an orchestrator over a frontier the caller keeps a handle to
    pub fn with_shared_frontier(frontier: Arc<F>, fetcher: D) -> Self {
        Self {
            inner: Arc::new(Inner {
                frontier,
                fetcher,
                admissions: RequestDeduplicator::new(aborted),
                fetches: RequestDeduplicator::new(aborted),
            }),
        }
    }

    pub fn frontier(&self) -> &Arc<F> {
        &self.inner.frontier
    }

    pub fn fetcher(&self) -> &D {
        &self.inner.fetcher
    }

    /// Admits `url` and fetches it once the frontier surfaces it
    ///
    /// The URL is queued before this returns. The outcome only arrives while
    /// something drains the pipeline, such as [`Self::results`] or
    /// [`Self::run_to_completion`]; use [`Self::send_url`] to drive it.
    /// Concurrent calls for the same URL share one admission.
    pub fn seed_url(&self, url: &str) -> PendingFetch<D::Output> {
        let this = self.clone();
        self.inner.admissions.get(url, move |url| {
            let admitted = this.inner.frontier.admit(url);
            async move {
                let url = admitted.await?;
                this.fetch(&url).await
            }
        })
    }

    /// Seeds `url` and drains the pipeline until its outcome is known
    ///
    /// The drain runs as its own task and keeps going after the seeded
    /// outcome is returned, so the rest of the queued work still moves. If
    /// the frontier is exhausted first, the seeded outcome is awaited on its
    /// own.
    pub async fn send_url(&self, url: &str) -> Result<D::Output, CrawlError> {
        let seeded = self.seed_url(url);
        let mut drain = tokio::spawn({
            let this = self.clone();
            async move { this.run_to_completion().await }
        });

        tokio::select! {
            outcome = seeded.clone() => outcome,
            drained = &mut drain => {
                match drained {
                    Ok(stats) => tracing::debug!(
                        "Pipeline drained after {} fetches while waiting for {}",
                        stats.total(),
                        url
                    ),
                    Err(e) => tracing::warn!("Pipeline drain for {} stopped: {}", url, e),
                }
                seeded.await
            }
        }
    }

    /// Fetches `url`, sharing any fetch of it already in flight
    pub fn fetch(&self, url: &str) -> PendingFetch<D::Output> {
        let fetcher = self.inner.fetcher.clone();
        self.inner.fetches.get(url, move |url| async move {
            tracing::debug!("Fetching {}", url);
            fetcher.fetch(&url).await
        })
    }

    /// Lazy stream of fetches, one per URL the frontier makes ready
    ///
    /// Nothing is dequeued or fetched until the stream is polled. Each item
    /// is the ready URL paired with its deduplicated fetch. The stream ends
    /// when the frontier is exhausted. Dropping it leaves started fetches
    /// running.
    pub fn results(
        &self,
    ) -> impl Stream<Item = (Link, PendingFetch<D::Output>)> + Send + 'static {
        stream::unfold(self.clone(), |this| async move {
            let url = this.inner.frontier.next_ready().await?;
            let pending = this.fetch(&url);
            Some(((url, pending), this))
        })
    }

    /// Drains [`Self::results`] until the frontier is exhausted
    pub async fn run_to_completion(&self) -> CrawlStats {
        self.crawl(|_, _| ControlFlow::Continue(())).await
    }

    /// Drains [`Self::results`], handing each outcome to `on_result`
    ///
    /// Stops when the frontier is exhausted or `on_result` breaks.
    pub async fn crawl<C>(&self, mut on_result: C) -> CrawlStats
    where
        C: FnMut(&str, &Result<D::Output, CrawlError>) -> ControlFlow<()>,
    {
        let mut stats = CrawlStats::start();
        let results = self.results();
        futures::pin_mut!(results);

        while let Some((url, pending)) = results.next().await {
            let outcome = pending.await;
            if let Err(e) = &outcome {
                tracing::warn!("Failed to fetch {}: {}", url, e);
            }
            stats.record(host_of(&url).ok().as_deref(), outcome.is_ok());

            if on_result(&url, &outcome).is_break() {
                tracing::info!("Crawl stopped after {} fetches", stats.total());
                break;
            }
        }

        stats.finish();
        stats
    }
}
