//! Per-host readiness scheduler ("host heap")
//!
//! Every host with pending work has a timestamp: the instant it was last
//! granted. A host becomes eligible again once `politeness_interval` has
//! elapsed since that instant. [`HostHeap::next`] hands out the most overdue
//! host, waiting out its politeness window first.
//!
//! The entries live in a map rather than a binary heap, so `next` is a linear
//! scan. Ties on the timestamp go to the host that was inserted first.

use crate::config::SchedulerConfig;
use crate::url::{host_of, Host};
use crate::UrlResult;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Scheduling entry for a host that is waiting to be granted
#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Last grant (or the implied one for first-seen hosts)
    timestamp: Instant,

    /// Insertion order, used to break ties between equal timestamps
    seq: u64,
}

#[derive(Debug, Default)]
struct HeapState {
    /// Hosts waiting to be granted
    ready: HashMap<Host, Entry>,

    /// Hosts claimed by a `next()` call that is still waiting out the
    /// politeness window, with the latest timestamp inserted for them since
    claimed: HashMap<Host, Option<Instant>>,

    next_seq: u64,
}

impl HeapState {
    fn upsert(&mut self, host: &str, timestamp: Instant) {
        if let Some(pending) = self.claimed.get_mut(host) {
            *pending = Some(pending.map_or(timestamp, |p| p.max(timestamp)));
            return;
        }

        match self.ready.get_mut(host) {
            Some(entry) => entry.timestamp = entry.timestamp.max(timestamp),
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.ready.insert(host.to_string(), Entry { timestamp, seq });
            }
        }
    }

    /// Removes the earliest entry and marks its host as claimed
    fn claim_earliest(&mut self) -> Option<(Host, Instant)> {
        let host = self
            .ready
            .iter()
            .min_by_key(|(_, entry)| (entry.timestamp, entry.seq))
            .map(|(host, _)| host.clone())?;

        let entry = self.ready.remove(&host)?;
        self.claimed.insert(host.clone(), None);
        Some((host, entry.timestamp))
    }

    fn release(&mut self, host: &str, timestamp: Instant) {
        // Cleared while claimed
        let Some(pending) = self.claimed.remove(host) else {
            return;
        };
        let timestamp = pending.map_or(timestamp, |p| p.max(timestamp));
        self.upsert(host, timestamp);
    }
}

/// Tracks when each host may next be fetched and hands out ready hosts
///
/// All operations take `&self`; the heap is meant to be shared between the
/// producer inserting hosts and any number of consumers calling [`next`].
/// Claiming a host is atomic, so a host is handed to exactly one caller per
/// politeness window even with concurrent consumers.
///
/// [`next`]: HostHeap::next
#[derive(Debug)]
pub struct HostHeap {
    state: Mutex<HeapState>,
    politeness_interval: Duration,
    poll_interval: Duration,
}

impl HostHeap {
    /// Creates an empty heap with the given politeness settings
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            state: Mutex::new(HeapState::default()),
            politeness_interval: config.politeness(),
            poll_interval: config.poll(),
        }
    }

    /// Minimum time between two grants of the same host
    pub fn politeness_interval(&self) -> Duration {
        self.politeness_interval
    }

    fn lock(&self) -> MutexGuard<'_, HeapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A timestamp that implies no wait, so first-seen hosts are eligible
    /// immediately (though possibly behind other overdue hosts)
    fn timestamp_with_no_implied_pause(&self) -> Instant {
        let now = Instant::now();
        now.checked_sub(self.politeness_interval).unwrap_or(now)
    }

    /// Upserts a host
    ///
    /// If the host is already present the later of the stored and the given
    /// timestamps wins. Without a timestamp the host is immediately eligible.
    pub fn insert(&self, host: &str, timestamp: Option<Instant>) {
        let timestamp = timestamp.unwrap_or_else(|| self.timestamp_with_no_implied_pause());
        self.lock().upsert(host, timestamp);
        tracing::trace!("Host {} scheduled", host);
    }

    /// Upserts the host of a URL
    ///
    /// # Returns
    ///
    /// * `Ok(Host)` - The host that was inserted
    /// * `Err(UrlError)` - The URL could not be parsed or has no host
    pub fn insert_url(&self, url: &str, timestamp: Option<Instant>) -> UrlResult<Host> {
        let host = host_of(url)?;
        self.insert(&host, timestamp);
        Ok(host)
    }

    /// Removes a host, typically once its back queue has been found empty
    pub fn remove(&self, host: &str) {
        self.lock().ready.remove(host);
    }

    /// Returns whether the heap tracks the host (waiting or currently claimed)
    pub fn has(&self, host: &str) -> bool {
        let state = self.lock();
        state.ready.contains_key(host) || state.claimed.contains_key(host)
    }

    /// Returns the stored timestamp for a waiting host
    pub fn timestamp(&self, host: &str) -> Option<Instant> {
        self.lock().ready.get(host).map(|entry| entry.timestamp)
    }

    /// Number of tracked hosts, including claimed ones
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.ready.len() + state.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. Calling it again is a no-op.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.ready.clear();
        state.claimed.clear();
    }

    /// Waits for the most overdue host and returns it
    ///
    /// The host with the earliest timestamp is claimed immediately, so no
    /// other caller can be handed it. Once its politeness window has passed
    /// it is re-inserted with the current time (starting its next window)
    /// and returned. Dropping the future before that puts the host back
    /// with its original timestamp.
    ///
    /// # Returns
    ///
    /// * `Some(Host)` - A host that may be fetched now
    /// * `None` - No unclaimed host has pending work
    pub async fn next(&self) -> Option<Host> {
        tokio::task::yield_now().await;

        let (host, timestamp) = self.lock().claim_earliest()?;
        let mut claim = Claim {
            heap: self,
            host: Some(host),
            timestamp,
        };

        let eligible_at = timestamp + self.politeness_interval;
        loop {
            let now = Instant::now();
            if now >= eligible_at {
                break;
            }
            tokio::time::sleep(self.poll_interval.min(eligible_at - now)).await;
        }

        claim.grant()
    }
}

/// A host taken out of the heap by `next()`; released on drop
struct Claim<'a> {
    heap: &'a HostHeap,
    host: Option<Host>,
    timestamp: Instant,
}

impl Claim<'_> {
    fn grant(&mut self) -> Option<Host> {
        let host = self.host.take()?;
        self.heap.lock().release(&host, Instant::now());
        tracing::trace!("Host {} granted", host);
        Some(host)
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if let Some(host) = self.host.take() {
            self.heap.lock().release(&host, self.timestamp);
        }
    }
}
