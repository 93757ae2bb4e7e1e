//! Per-host back queues
//!
//! Each host with queued work owns a FIFO of links. A queue is created when
//! its first link arrives and dropped as soon as its last link is taken, so
//! an absent queue and an empty one mean the same thing.

use crate::url::{Host, Link};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Routes a host to its back queue and takes the next link from it
///
/// The selector races `dequeue` against an immediate "empty" signal, so an
/// implementation that cannot produce a link almost at once is treated as
/// drained for this pass.
pub trait BackQueueRouter: Send + Sync {
    fn dequeue(&self, host: &str) -> impl Future<Output = Option<Link>> + Send;
}

#[derive(Debug, Default)]
struct QueueState {
    queues: HashMap<Host, VecDeque<Link>>,
    /// Every link currently waiting in some queue
    queued: HashSet<Link>,
}

/// In-memory back queues keyed by host
#[derive(Debug, Default)]
pub struct BackQueues {
    state: Mutex<QueueState>,
}

impl BackQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a link to its host's queue
    ///
    /// # Returns
    ///
    /// `false` if the link is already waiting in a queue (nothing is added)
    pub fn push(&self, host: &str, link: Link) -> bool {
        let mut state = self.lock();
        if !state.queued.insert(link.clone()) {
            return false;
        }
        state
            .queues
            .entry(host.to_string())
            .or_default()
            .push_back(link);
        true
    }

    /// Takes the oldest link queued for a host
    pub fn pop(&self, host: &str) -> Option<Link> {
        let mut state = self.lock();
        let queue = state.queues.get_mut(host)?;
        let link = queue.pop_front();
        if queue.is_empty() {
            state.queues.remove(host);
        }
        if let Some(link) = &link {
            state.queued.remove(link);
        }
        link
    }

    /// Returns whether the link is waiting in any queue
    pub fn contains(&self, link: &str) -> bool {
        self.lock().queued.contains(link)
    }

    /// Number of links queued for a host
    pub fn queue_len(&self, host: &str) -> usize {
        self.lock().queues.get(host).map_or(0, VecDeque::len)
    }

    /// Total number of queued links
    pub fn len(&self) -> usize {
        self.lock().queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of hosts with a non-empty queue
    pub fn host_count(&self) -> usize {
        self.lock().queues.len()
    }

    /// Hosts that currently have queued links
    pub fn hosts(&self) -> Vec<Host> {
        self.lock().queues.keys().cloned().collect()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.queues.clear();
        state.queued.clear();
    }
}

impl BackQueueRouter for BackQueues {
    async fn dequeue(&self, host: &str) -> Option<Link> {
        self.pop(host)
    }
}
