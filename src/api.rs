use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::{RawQuery, State},
    routing::get,
    Json, Router,
};
use futures::FutureExt;
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;

use crate::debug;
use crate::ingest::aggregate::{
    AggregateParams, AggregationOutput, FeedErrorEntry, DEFAULT_LOOKBACK_HOURS,
    DEFAULT_MAX_PER_FEED,
};
use crate::ingest::types::NormalizedItem;
use crate::ingest::Aggregator;

pub const RSS_ROUTE: &str = "/api/calendar/rss";

/// POST bodies beyond this are treated like unreadable ones (`{}`).
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(RSS_ROUTE, get(rss_get).post(rss_post))
        .merge(debug::router::<AppState>())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Short alias used by tests and the binary.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DebugInfo {
    #[serde(rename_all = "camelCase")]
    Report {
        feeds_in_env: usize,
        errors: Vec<FeedErrorEntry>,
    },
    Failed {
        error: String,
    },
}

/// Body of every response from the RSS endpoint, success or not.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponsePayload {
    pub count: usize,
    pub items: Vec<NormalizedItem>,
    pub debug: DebugInfo,
}

impl From<AggregationOutput> for ResponsePayload {
    fn from(out: AggregationOutput) -> Self {
        Self {
            count: out.count,
            items: out.items,
            debug: DebugInfo::Report {
                feeds_in_env: out.feeds_in_env,
                errors: out.errors,
            },
        }
    }
}

impl ResponsePayload {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            count: 0,
            items: Vec::new(),
            debug: DebugInfo::Failed {
                error: error.into(),
            },
        }
    }
}

/// Run one aggregation. Anything unexpected (a panic inside aggregation) is turned into
/// the empty payload with `debug.error`; this never fails.
pub async fn respond(
    aggregator: &Aggregator,
    params: &AggregateParams,
) -> Result<ResponsePayload, Infallible> {
    guarded(aggregator.run(params)).await
}

async fn guarded<F>(run: F) -> Result<ResponsePayload, Infallible>
where
    F: Future<Output = AggregationOutput>,
{
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(out) => Ok(out.into()),
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            counter!("aggregate_failures_total").increment(1);
            tracing::error!(error = %msg, "aggregation failed");
            Ok(ResponsePayload::failed(msg))
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_string()
    }
}

async fn serve(state: &AppState, params: AggregateParams) -> Json<ResponsePayload> {
    let t0 = Instant::now();
    let payload = match respond(&state.aggregator, &params).await {
        Ok(p) => p,
        Err(never) => match never {},
    };
    debug::record_request(t0.elapsed().as_millis(), &payload);
    Json(payload)
}

async fn rss_get(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<ResponsePayload> {
    let params = params_from_query(query.as_deref().unwrap_or_default());
    serve(&state, params).await
}

// `Body`, not `Bytes`: an oversized body still gets a 200, with default params.
async fn rss_post(State(state): State<AppState>, body: Body) -> Json<ResponsePayload> {
    let params = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => params_from_body(&bytes),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable request body, using defaults");
            AggregateParams::default()
        }
    };
    serve(&state, params).await
}

/* ----------------------------
Request parameters
---------------------------- */

/// JSON body → params. A body that is empty or not a JSON object counts as `{}`.
pub fn params_from_body(body: &[u8]) -> AggregateParams {
    let obj = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    params_from_object(&obj)
}

pub fn params_from_object(obj: &Map<String, Value>) -> AggregateParams {
    let defaults = AggregateParams::default();

    let lookback_hours = obj
        .get("lookbackHours")
        .and_then(number_from_value)
        .unwrap_or(DEFAULT_LOOKBACK_HOURS);
    let max_per_feed = obj
        .get("maxPerFeed")
        .and_then(number_from_value)
        .map(per_feed_from_f64)
        .unwrap_or(DEFAULT_MAX_PER_FEED);
    let tiers = match obj.get("tiers") {
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => defaults.tiers,
    };

    AggregateParams {
        lookback_hours,
        max_per_feed,
        tiers,
    }
}

/// Query string → params. `tiers` may repeat or hold a comma-separated list.
pub fn params_from_query(query: &str) -> AggregateParams {
    let defaults = AggregateParams::default();
    let mut lookback_hours = None;
    let mut max_per_feed = None;
    let mut tiers: Option<Vec<String>> = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "lookbackHours" => lookback_hours = number_from_str(&value).or(lookback_hours),
            "maxPerFeed" => max_per_feed = number_from_str(&value).or(max_per_feed),
            "tiers" | "tiers[]" => tiers.get_or_insert_with(Vec::new).extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            ),
            _ => {}
        }
    }

    AggregateParams {
        lookback_hours: lookback_hours.unwrap_or(DEFAULT_LOOKBACK_HOURS),
        max_per_feed: max_per_feed
            .map(per_feed_from_f64)
            .unwrap_or(DEFAULT_MAX_PER_FEED),
        tiers: tiers.unwrap_or(defaults.tiers),
    }
}

fn number_from_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => number_from_str(s),
        _ => None,
    }
}

fn number_from_str(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

fn per_feed_from_f64(x: f64) -> usize {
    if x <= 0.0 {
        0
    } else {
        x.floor() as usize
    }
}
