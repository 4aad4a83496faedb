//! Prometheus export for the aggregation series.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide recorder, describe every series the service emits and
    /// publish the per-feed deadline. Fails if a recorder is already installed.
    pub fn init(feed_timeout_ms: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        describe();
        gauge!("feed_timeout_ms").set(feed_timeout_ms as f64);

        Ok(Self { handle })
    }

    /// `GET /metrics`, mergeable into any router state.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("feeds_fetched_total", "Feeds fetched and parsed successfully.");
    describe_counter!("feed_errors_total", "Feed fetch/parse failures.");
    describe_histogram!("feed_fetch_ms", "Per-feed fetch + parse time in milliseconds.");
    describe_counter!("aggregate_requests_total", "Aggregation runs.");
    describe_counter!(
        "aggregate_failures_total",
        "Aggregation runs that failed unexpectedly."
    );
    describe_gauge!(
        "aggregate_items_returned",
        "Items returned by the last aggregation run."
    );
    describe_gauge!("feed_timeout_ms", "Configured per-feed deadline in milliseconds.");
}
