//! Concurrency primitives for fan-out dispatch
//!
//! The two comparison modes want different ordering guarantees, so each
//! gets its own named primitive instead of an ad hoc parallel-call
//! helper:
//!
//! - [`join_batch`]: wait for every branch, fail the whole batch if any
//!   branch fails. Results come back in request order; nothing is
//!   observable until the join completes.
//! - [`CommitEach`]: yield each branch's result as it resolves, in
//!   completion order, so the caller can commit partial results while
//!   later branches are still in flight.

use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Run every future concurrently and suspend until all settle.
///
/// All-or-nothing join: the first error aborts the batch and no partial
/// results are returned. On success the results are in request order
/// regardless of completion order.
pub async fn join_batch<T, E, F>(futures: Vec<F>) -> Result<Vec<T>, E>
where
    F: Future<Output = Result<T, E>>,
{
    futures::future::try_join_all(futures).await
}

/// Fan-out that yields results in completion order.
///
/// Unlike [`join_batch`], callers observe each branch as soon as it
/// resolves; append order therefore follows completion order, not
/// request order. That is the documented contract, not an accident.
pub struct CommitEach<F: Future> {
    pending: FuturesUnordered<F>,
}

impl<F: Future> CommitEach<F> {
    pub fn new() -> Self {
        Self {
            pending: FuturesUnordered::new(),
        }
    }

    /// Add a branch to the fan-out
    pub fn push(&mut self, future: F) {
        self.pending.push(future);
    }

    /// Number of branches still in flight
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for the next branch to resolve; `None` once all have settled
    pub async fn next(&mut self) -> Option<F::Output> {
        self.pending.next().await
    }
}

impl<F: Future> Default for CommitEach<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Future> FromIterator<F> for CommitEach<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self {
            pending: iter.into_iter().collect(),
        }
    }
}

/// Counters for one model's dispatched requests
#[derive(Debug, Default)]
pub struct RequestStats {
    /// Total requests made
    pub requests: AtomicU64,
    /// Successful requests
    pub successes: AtomicU64,
    /// Failed requests
    pub failures: AtomicU64,
    /// Total latency in ms across successful requests
    pub total_latency_ms: AtomicU64,
}

impl RequestStats {
    /// Mean latency of successful requests, if any completed
    pub fn mean_latency_ms(&self) -> Option<u64> {
        let successes = self.successes.load(Ordering::Relaxed);
        if successes == 0 {
            return None;
        }
        Some(self.total_latency_ms.load(Ordering::Relaxed) / successes)
    }
}

/// Per-model request statistics, keyed by display name
#[derive(Debug, Default)]
pub struct StatsMap {
    map: DashMap<String, Arc<RequestStats>>,
}

impl StatsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request for `model`
    pub fn record(&self, model: &str, latency_ms: u64, success: bool) {
        let stats = self
            .map
            .entry(model.to_string())
            .or_insert_with(|| Arc::new(RequestStats::default()))
            .clone();

        stats.requests.fetch_add(1, Ordering::Relaxed);
        if success {
            stats.successes.fetch_add(1, Ordering::Relaxed);
            stats.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        } else {
            stats.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Stats for one model, if it has dispatched anything
    pub fn get(&self, model: &str) -> Option<Arc<RequestStats>> {
        self.map.get(model).map(|s| Arc::clone(&s))
    }

    /// Snapshot of (model, requests, successes, failures, mean latency)
    /// for every model seen so far, sorted by model name
    pub fn snapshot(&self) -> Vec<(String, u64, u64, u64, Option<u64>)> {
        let mut rows: Vec<_> = self
            .map
            .iter()
            .map(|entry| {
                let stats = entry.value();
                (
                    entry.key().clone(),
                    stats.requests.load(Ordering::Relaxed),
                    stats.successes.load(Ordering::Relaxed),
                    stats.failures.load(Ordering::Relaxed),
                    stats.mean_latency_ms(),
                )
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_join_batch_preserves_request_order() {
        // Resolve the first branch last; the result order must still be
        // the request order.
        let (tx_a, rx_a) = oneshot::channel::<()>();
        let futures = vec![
            Box::pin(async move {
                let _ = rx_a.await;
                Ok::<_, String>("a")
            }) as std::pin::Pin<Box<dyn Future<Output = Result<&str, String>> + Send>>,
            Box::pin(async move {
                tx_a.send(()).ok();
                Ok("b")
            }),
        ];

        let results = join_batch(futures).await.unwrap();
        assert_eq!(results, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_join_batch_fails_whole_batch() {
        let futures = vec![
            Box::pin(async { Ok::<_, String>(1) })
                as std::pin::Pin<Box<dyn Future<Output = Result<i32, String>> + Send>>,
            Box::pin(async { Err("boom".to_string()) }),
        ];

        assert_eq!(join_batch(futures).await, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_commit_each_yields_completion_order() {
        let mut pending = CommitEach::new();
        pending.push(Box::pin(async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            "slow"
        })
            as std::pin::Pin<Box<dyn Future<Output = &str> + Send>>);
        pending.push(Box::pin(async { "fast" }));

        assert_eq!(pending.len(), 2);
        assert_eq!(pending.next().await, Some("fast"));
        assert_eq!(pending.next().await, Some("slow"));
        assert_eq!(pending.next().await, None);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_stats_record_and_snapshot() {
        let stats = StatsMap::new();
        stats.record("GPT-4.1 Mini", 100, true);
        stats.record("GPT-4.1 Mini", 200, true);
        stats.record("GPT-4.1 Mini", 0, false);
        stats.record("GPT-4o Mini", 50, true);

        let mini = stats.get("GPT-4.1 Mini").unwrap();
        assert_eq!(mini.requests.load(Ordering::Relaxed), 3);
        assert_eq!(mini.successes.load(Ordering::Relaxed), 2);
        assert_eq!(mini.failures.load(Ordering::Relaxed), 1);
        assert_eq!(mini.mean_latency_ms(), Some(150));

        let rows = stats.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "GPT-4.1 Mini");
        assert_eq!(rows[1].0, "GPT-4o Mini");
        assert!(stats.get("GPT-4.1 Nano").is_none());
    }
}
