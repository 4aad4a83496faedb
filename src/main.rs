//! Calendar RSS Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the calendar registry, feed fetcher, metrics and routes.

use calendar_rss::{api, build_state, logging, metrics::Metrics, ServiceConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    logging::init();

    let cfg = ServiceConfig::from_env();
    let state = build_state(&cfg)?;
    let mut router = api::create_router(state);

    match Metrics::init(cfg.feed_timeout.as_millis() as u64) {
        Ok(m) => router = router.merge(m.router::<()>()),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    Ok(router.into())
}
