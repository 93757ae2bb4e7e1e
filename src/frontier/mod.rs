//! URL frontier: per-host back queues drained under politeness
//!
//! This module contains:
//! - The [`Frontier`] interface consumed by the orchestrator
//! - The host readiness scheduler ([`HostHeap`])
//! - Back-queue selection ([`select_next_url`])
//! - [`UrlFrontier`], an in-memory frontier built from the pieces above
//!
//! Front-queue prioritization is not modelled here: admitted links go
//! straight to their host's back queue in arrival order.

mod back_queue;
mod host_heap;
mod selector;

pub use back_queue::{BackQueueRouter, BackQueues};
pub use host_heap::HostHeap;
pub use selector::select_next_url;

use crate::config::SchedulerConfig;
use crate::url::{host_of, Link};
use crate::CrawlError;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// The frontier surface the orchestrator drives
pub trait Frontier: Send + Sync + 'static {
    /// Admits a URL
    ///
    /// The URL is queued before this returns. The future resolves with the
    /// URL once the frontier has surfaced it as ready for fetching, which
    /// only happens while someone pulls [`Frontier::next_ready`].
    /// The returned future does not borrow the frontier.
    fn admit(&self, url: Link) -> BoxFuture<'static, Result<Link, CrawlError>>;

    /// Queues a URL without waiting for it to become ready
    fn enqueue(&self, url: &str) -> Result<(), CrawlError>;

    /// Waits for the next URL whose host may be fetched now
    ///
    /// Returns `None` once no host has queued work.
    fn next_ready(&self) -> impl Future<Output = Option<Link>> + Send;
}

type Waiters = HashMap<Link, Vec<oneshot::Sender<()>>>;

/// In-memory frontier
///
/// Links are grouped into per-host FIFO back queues; the [`HostHeap`]
/// decides which host is served next.
#[derive(Debug)]
pub struct UrlFrontier {
    host_heap: HostHeap,
    back_queues: BackQueues,
    /// Admissions waiting for their URL to be surfaced
    waiters: Mutex<Waiters>,
}

impl UrlFrontier {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            host_heap: HostHeap::new(config),
            back_queues: BackQueues::new(),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    pub fn host_heap(&self) -> &HostHeap {
        &self.host_heap
    }

    pub fn back_queues(&self) -> &BackQueues {
        &self.back_queues
    }

    /// Number of links waiting in back queues
    pub fn queued_len(&self) -> usize {
        self.back_queues.len()
    }

    /// Number of hosts the scheduler is tracking
    pub fn host_count(&self) -> usize {
        self.host_heap.len()
    }

    /// Drops all queued work
    ///
    /// Outstanding admissions fail with [`CrawlError::FrontierClosed`].
    pub fn clear(&self) {
        self.lock_waiters().clear();
        self.back_queues.clear();
        self.host_heap.clear();
    }

    fn lock_waiters(&self) -> MutexGuard<'_, Waiters> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self, host: &str, url: &str) {
        if self.back_queues.push(host, url.to_string()) {
            self.host_heap.insert(host, None);
            tracing::trace!("Queued {}", url);
        } else {
            tracing::trace!("{} is already queued", url);
        }
    }

    fn notify(&self, url: &str) {
        let waiting = self.lock_waiters().remove(url).unwrap_or_default();
        for waiter in waiting {
            // The admitting side may have given up already
            let _ = waiter.send(());
        }
    }

    /// Puts hosts that still have queued links but no scheduler entry back
    /// into the heap
    ///
    /// A host can end up like this when a link arrives between the selector
    /// finding its queue empty and evicting it. The host was granted at the
    /// moment of eviction, so rescheduling it without a timestamp does not
    /// shorten its politeness window.
    fn reschedule_stranded_hosts(&self) -> bool {
        let mut rescheduled = false;
        for host in self.back_queues.hosts() {
            if !self.host_heap.has(&host) {
                tracing::debug!("Rescheduling stranded host {}", host);
                self.host_heap.insert(&host, None);
                rescheduled = true;
            }
        }
        rescheduled
    }
}

impl Frontier for UrlFrontier {
    fn admit(&self, url: Link) -> BoxFuture<'static, Result<Link, CrawlError>> {
        let registered = host_of(&url).map(|host| {
            let (sender, receiver) = oneshot::channel();
            self.lock_waiters()
                .entry(url.clone())
                .or_default()
                .push(sender);
            self.queue(&host, &url);
            receiver
        });

        async move {
            let ready = match registered {
                Ok(receiver) => receiver,
                Err(err) => return Err(CrawlError::from(err)),
            };
            match ready.await {
                Ok(()) => Ok(url),
                Err(_) => Err(CrawlError::FrontierClosed { url }),
            }
        }
        .boxed()
    }

    fn enqueue(&self, url: &str) -> Result<(), CrawlError> {
        let host = host_of(url)?;
        self.queue(&host, url);
        Ok(())
    }

    async fn next_ready(&self) -> Option<Link> {
        loop {
            if let Some(url) = select_next_url(&self.host_heap, &self.back_queues).await {
                self.notify(&url);
                return Some(url);
            }
            if !self.reschedule_stranded_hosts() {
                tracing::debug!("Frontier exhausted");
                return None;
            }
        }
    }
}
