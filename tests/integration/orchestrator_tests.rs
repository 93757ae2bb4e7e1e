//! Orchestrator behavior through the public API
//!
//! Timing-sensitive tests run on a paused Tokio clock so politeness waits
//! complete instantly and deterministically.

use futures::future::join_all;
use futures::{FutureExt, StreamExt};
use mercator_frontier::config::SchedulerConfig;
use mercator_frontier::crawler::{DataFetcher, FnFetcher, Orchestrator};
use mercator_frontier::{CrawlError, Frontier, Link, UrlFrontier};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Records every fetch call per URL
#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<HashMap<String, usize>>>);

impl CallLog {
    fn record(&self, url: &str) -> usize {
        let mut calls = self.0.lock().unwrap();
        let count = calls.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn count(&self, url: &str) -> usize {
        self.0.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.0.lock().unwrap().values().sum()
    }
}

/// Fetcher that takes 50ms, fails the first attempt at any URL containing
/// "flaky", and returns a body derived from the URL otherwise
fn orchestrator(
    politeness_interval: u64,
    calls: &CallLog,
) -> Orchestrator<UrlFrontier, impl DataFetcher<Output = String>> {
    let calls = calls.clone();
    let fetch = move |url: Link| {
        let attempt = calls.record(&url);
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if url.contains("flaky") && attempt == 1 {
                Err(CrawlError::Request {
                    url,
                    message: "connection reset".to_string(),
                })
            } else {
                Ok(format!("body of {} (attempt {})", url, attempt))
            }
        }
        .boxed()
    };

    Orchestrator::new(
        UrlFrontier::new(SchedulerConfig {
            politeness_interval,
            poll_interval: 10,
        }),
        FnFetcher::new(fetch),
    )
}

#[tokio::test(start_paused = true)]
async fn test_send_url_and_external_drain_share_one_fetch() {
    let calls = CallLog::default();
    let orchestrator = orchestrator(1000, &calls);
    orchestrator.frontier().enqueue("https://a.example/1").unwrap();

    let consumer = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let results = orchestrator.results();
            futures::pin_mut!(results);
            let mut observed = Vec::new();
            while let Some((url, pending)) = results.next().await {
                observed.push((url, pending.await));
            }
            observed
        })
    };

    // The consumer has fetched a.example/1 and is waiting out the
    // politeness window before it can serve a.example again
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sent = orchestrator.send_url("https://a.example/2").await;
    let observed = consumer.await.unwrap();

    assert_eq!(sent, Ok("body of https://a.example/2 (attempt 1)".to_string()));
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[1], ("https://a.example/2".to_string(), sent));
    assert_eq!(calls.count("https://a.example/2"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_send_url_share_one_outcome() {
    let calls = CallLog::default();
    let orchestrator = orchestrator(1000, &calls);

    let outcomes = join_all((0..3).map(|_| orchestrator.send_url("https://a.example/"))).await;

    assert_eq!(calls.count("https://a.example/"), 1);
    assert!(outcomes
        .iter()
        .all(|o| o.as_deref() == Ok("body of https://a.example/ (attempt 1)")));
    assert_eq!(orchestrator.frontier().queued_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_url_after_settlement_fetches_again() {
    let calls = CallLog::default();
    let orchestrator = orchestrator(1000, &calls);

    let start = Instant::now();
    let first = orchestrator.send_url("https://a.example/").await;
    let second = orchestrator.send_url("https://a.example/").await;

    assert_eq!(first, Ok("body of https://a.example/ (attempt 1)".to_string()));
    assert_eq!(second, Ok("body of https://a.example/ (attempt 2)".to_string()));
    assert_eq!(calls.count("https://a.example/"), 2);
    // The re-admitted URL still waits for its host's politeness window
    assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_shared_and_retried_fresh() {
    let calls = CallLog::default();
    let orchestrator = orchestrator(1000, &calls);
    let url = "https://a.example/flaky";

    let outcomes = join_all((0..3).map(|_| orchestrator.fetch(url))).await;
    let expected = Err(CrawlError::Request {
        url: url.to_string(),
        message: "connection reset".to_string(),
    });
    assert!(outcomes.iter().all(|o| *o == expected));
    assert_eq!(calls.count(url), 1);

    // No negative caching: the next call runs the fetch again
    assert_eq!(
        orchestrator.fetch(url).await,
        Ok("body of https://a.example/flaky (attempt 2)".to_string())
    );
    assert_eq!(calls.count(url), 2);
}

#[tokio::test(start_paused = true)]
async fn test_result_stream_respects_politeness() {
    let calls = CallLog::default();
    let orchestrator = orchestrator(500, &calls);
    for url in [
        "https://a.example/1",
        "https://b.example/1",
        "https://a.example/2",
        "https://b.example/2",
        "https://c.example/1",
    ] {
        orchestrator.frontier().enqueue(url).unwrap();
    }

    let start = Instant::now();
    let results = orchestrator.results();
    futures::pin_mut!(results);
    let mut fetched_at: HashMap<String, Vec<Duration>> = HashMap::new();
    while let Some((url, pending)) = results.next().await {
        let elapsed = start.elapsed();
        assert!(pending.await.is_ok());
        let host = mercator_frontier::host_of(&url).unwrap();
        fetched_at.entry(host).or_default().push(elapsed);
    }

    assert_eq!(calls.total(), 5);
    for times in fetched_at.values() {
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }
    // c.example is new and is served before a or b come round again
    assert!(fetched_at["c.example"][0] < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_stream_leaves_fetch_running() {
    let calls = CallLog::default();
    let orchestrator = orchestrator(1000, &calls);
    orchestrator.frontier().enqueue("https://a.example/").unwrap();

    {
        let results = orchestrator.results();
        futures::pin_mut!(results);
        let (url, _pending) = results.next().await.unwrap();
        assert_eq!(url, "https://a.example/");
    }

    // Joining afterwards still observes the original fetch
    let outcome = orchestrator.fetch("https://a.example/").await;
    assert_eq!(outcome, Ok("body of https://a.example/ (attempt 1)".to_string()));
    assert_eq!(calls.count("https://a.example/"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_send_url_keeps_draining_after_returning() {
    let calls = CallLog::default();
    let orchestrator = orchestrator(1000, &calls);

    // Queue the URL, then a second link for the same host behind it
    let seeded = orchestrator.seed_url("https://b.example/x");
    orchestrator
        .frontier()
        .enqueue("https://b.example/other")
        .unwrap();

    let start = Instant::now();
    let sent = orchestrator.send_url("https://b.example/x").await;
    assert_eq!(sent, Ok("body of https://b.example/x (attempt 1)".to_string()));
    assert_eq!(seeded.await, sent);
    assert!(start.elapsed() < Duration::from_millis(1000));
    assert_eq!(calls.count("https://b.example/other"), 0);

    // Nobody else pulls the stream; the drain started by send_url does
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(calls.count("https://b.example/other"), 1);
    assert_eq!(orchestrator.frontier().queued_len(), 0);
    assert_eq!(orchestrator.frontier().host_count(), 0);
}
