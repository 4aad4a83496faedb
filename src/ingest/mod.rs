// src/ingest/mod.rs
pub mod aggregate;
pub mod fetcher;
pub mod parse;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge};
use tokio::sync::Semaphore;

use crate::calendar::{select_urls, CalendarRegistry};
use crate::ingest::aggregate::{aggregate, AggregateParams, AggregationOutput};
use crate::ingest::types::{FeedFetcher, FeedTarget, FetchResult};

/// Fetch every target concurrently, one task per URL, and wait for all of them.
/// `results[i]` belongs to `targets[i]`. A task that panics becomes a failure for its feed.
pub async fn fetch_all(
    targets: &[FeedTarget],
    fetcher: Arc<dyn FeedFetcher>,
    limit: Option<Arc<Semaphore>>,
) -> Vec<FetchResult> {
    let handles: Vec<_> = targets
        .iter()
        .map(|t| {
            let fetcher = fetcher.clone();
            let limit = limit.clone();
            let url = t.url.clone();
            tokio::spawn(async move {
                let _permit = match limit {
                    Some(sem) => match sem.acquire_owned().await {
                        Ok(p) => Some(p),
                        Err(_) => return FetchResult::failure("fetch limiter closed"),
                    },
                    None => None,
                };
                fetcher.fetch(&url).await
            })
        })
        .collect();

    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| {
            joined.unwrap_or_else(|e| FetchResult::failure(format!("fetch task failed: {e}")))
        })
        .collect()
}

/// Select → fetch → aggregate, over an injected registry and fetcher.
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<CalendarRegistry>,
    fetcher: Arc<dyn FeedFetcher>,
    limit: Option<Arc<Semaphore>>,
}

impl Aggregator {
    pub fn new(registry: Arc<CalendarRegistry>, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            limit: None,
        }
    }

    /// Cap the number of fetches in flight across all requests. `None` or 0 removes the cap.
    pub fn with_max_concurrent_fetches(mut self, max: Option<usize>) -> Self {
        self.limit = max.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    pub async fn run(&self, params: &AggregateParams) -> AggregationOutput {
        let t0 = Instant::now();

        let targets = select_urls(&self.registry, &params.tiers);
        let results = fetch_all(&targets, self.fetcher.clone(), self.limit.clone()).await;
        let out = aggregate(&targets, results, params, chrono::Utc::now());

        counter!("aggregate_requests_total").increment(1);
        gauge!("aggregate_items_returned").set(out.count as f64);
        tracing::info!(
            target: "aggregate",
            feeds = out.feeds_in_env,
            errors = out.errors.len(),
            items = out.count,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "aggregation finished"
        );
        out
    }
}
