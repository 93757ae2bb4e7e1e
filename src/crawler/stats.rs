//! Crawl loop statistics
//!
//! Counters collected while draining the result stream, plus the console
//! summary printed by the CLI at the end of a run.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// Outcome counters for one drain of the result stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    /// When the drain started
    pub started_at: DateTime<Utc>,

    /// When the drain finished (`None` while still running)
    pub finished_at: Option<DateTime<Utc>>,

    /// Fetches that resolved successfully
    pub fetched: u64,

    /// Fetches that resolved with an error
    pub failed: u64,

    /// Fetch counts per host
    pub pages_by_host: HashMap<String, u64>,
}

impl CrawlStats {
    /// Starts a new set of counters stamped with the current time
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            fetched: 0,
            failed: 0,
            pages_by_host: HashMap::new(),
        }
    }

    /// Records one settled fetch
    pub fn record(&mut self, host: Option<&str>, success: bool) {
        if success {
            self.fetched += 1;
        } else {
            self.failed += 1;
        }
        if let Some(host) = host {
            *self.pages_by_host.entry(host.to_string()).or_insert(0) += 1;
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Total number of settled fetches
    pub fn total(&self) -> u64 {
        self.fetched + self.failed
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.fetched as f64 / total as f64) * 100.0
    }

    /// Wall-clock duration of the drain, if it has finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Crawl Statistics ===")?;
        writeln!(f)?;
        writeln!(f, "Started: {}", self.started_at.to_rfc3339())?;
        if let Some(finished_at) = self.finished_at {
            writeln!(f, "Finished: {}", finished_at.to_rfc3339())?;
        }
        if let Some(duration) = self.duration_seconds() {
            writeln!(f, "Duration: {}s", duration)?;
        }
        writeln!(f)?;

        if !self.pages_by_host.is_empty() {
            writeln!(f, "Pages by Host:")?;
            // Sort hosts by count (descending)
            let mut host_counts: Vec<_> = self.pages_by_host.iter().collect();
            host_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (host, count) in host_counts {
                writeln!(f, "  {}: {}", host, count)?;
            }
            writeln!(f)?;
        }

        write!(
            f,
            "Success Rate: {:.1}% ({} / {} pages fetched)",
            self.success_rate(),
            self.fetched,
            self.total()
        )
    }
}
