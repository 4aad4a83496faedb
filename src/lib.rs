// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod calendar;
pub mod config;
pub mod debug;
pub mod ingest;
pub mod logging;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState, ResponsePayload};
pub use crate::calendar::{CalendarEntry, CalendarRegistry, FeedDescriptor, Tier};
pub use crate::config::ServiceConfig;
pub use crate::ingest::aggregate::AggregateParams;
pub use crate::ingest::Aggregator;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::ingest::fetcher::HttpFeedFetcher;

/// Load the calendar named by `cfg` (or the default fallback chain).
pub fn load_registry(cfg: &ServiceConfig) -> anyhow::Result<CalendarRegistry> {
    match &cfg.calendar_path {
        Some(p) => calendar::load_from(p),
        None => calendar::load_default(),
    }
}

/// Wire registry + HTTP fetcher into the shared state used by the router.
pub fn build_state(cfg: &ServiceConfig) -> anyhow::Result<AppState> {
    let registry = load_registry(cfg).context("loading calendar registry")?;
    let fetcher = HttpFeedFetcher::new(cfg.feed_timeout, &cfg.user_agent)
        .context("building HTTP client")?;

    info!(
        entries = registry.len(),
        timeout_ms = cfg.feed_timeout.as_millis() as u64,
        max_concurrent = ?cfg.max_concurrent_fetches,
        "calendar aggregator ready"
    );

    let aggregator = Aggregator::new(Arc::new(registry), Arc::new(fetcher))
        .with_max_concurrent_fetches(cfg.max_concurrent_fetches);
    Ok(AppState { aggregator })
}
