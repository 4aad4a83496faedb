// src/logging.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "calendar_rss=info,aggregate=info,warn";

/// Install the global tracing subscriber.
///
/// - Filter from `RUST_LOG`, else `calendar_rss=info,aggregate=info,warn`.
/// - `LOG_FORMAT=json` switches to JSON lines; anything else is compact text.
///
/// A subscriber installed earlier (e.g. by the Shuttle runtime or a test) is left in place.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };

    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
