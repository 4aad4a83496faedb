//! In-process request diagnostics: `/debug/stats` and `/debug/history`.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use axum::{extract::Query, routing::get, Json, Router};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::api::{DebugInfo, ResponsePayload};

const HISTORY_CAP: usize = 500;
const LAT_CAP: usize = 200;
const SLOW_REQ_MS: u128 = 10_000;

#[derive(Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub at_unix_ms: i64,
    pub latency_ms: u128,
    pub count: usize,
    pub feeds: usize,
    pub errors: usize,
    pub failed: bool,
}

#[derive(Default, Clone, Serialize)]
pub struct Stats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub feed_errors: u64,
    pub last_latency_ms: Option<u128>,
    pub last_slow_ms: Option<u128>,
    pub rolling_avg_ms: Option<f64>,
}

static HISTORY: Lazy<Mutex<VecDeque<RunRecord>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(HISTORY_CAP)));
static STATS: Lazy<Mutex<Stats>> = Lazy::new(|| Mutex::new(Stats::default()));
static LAT_MS: Lazy<Mutex<VecDeque<u128>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(LAT_CAP)));

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poison) => poison.into_inner(),
    }
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/debug/history", get(history))
        .route("/debug/stats", get(stats))
}

/// Record one finished request to the RSS endpoint.
pub fn record_request(latency_ms: u128, payload: &ResponsePayload) {
    let (feeds, errors, failed) = match &payload.debug {
        DebugInfo::Report {
            feeds_in_env,
            errors,
        } => (*feeds_in_env, errors.len(), false),
        DebugInfo::Failed { .. } => (0, 0, true),
    };

    {
        let mut q = locked(&LAT_MS);
        if q.len() >= LAT_CAP {
            q.pop_front();
        }
        q.push_back(latency_ms);

        let mut s = locked(&STATS);
        s.total_requests += 1;
        if failed {
            s.failed_requests += 1;
        }
        s.feed_errors += errors as u64;
        s.last_latency_ms = Some(latency_ms);
        let sum: u128 = q.iter().copied().sum();
        s.rolling_avg_ms = Some(sum as f64 / q.len() as f64);
        if latency_ms > SLOW_REQ_MS {
            s.last_slow_ms = Some(latency_ms);
        }
    }

    let mut h = locked(&HISTORY);
    if h.len() >= HISTORY_CAP {
        h.pop_front();
    }
    h.push_back(RunRecord {
        at_unix_ms: chrono::Utc::now().timestamp_millis(),
        latency_ms,
        count: payload.count,
        feeds,
        errors,
        failed,
    });
}

pub fn snapshot() -> Stats {
    locked(&STATS).clone()
}

async fn history(Query(q): Query<HistoryQuery>) -> Json<Vec<RunRecord>> {
    let limit = q.limit.unwrap_or(50);
    let h = locked(&HISTORY);
    let start = h.len().saturating_sub(limit);
    Json(h.iter().skip(start).cloned().collect())
}

async fn stats() -> Json<Stats> {
    Json(snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_and_reported_requests_are_counted() {
        let before = snapshot();
        record_request(
            12,
            &ResponsePayload {
                count: 0,
                items: vec![],
                debug: DebugInfo::Report {
                    feeds_in_env: 3,
                    errors: vec![crate::ingest::aggregate::FeedErrorEntry {
                        source: "s".into(),
                        url: "u".into(),
                        error: "e".into(),
                    }],
                },
            },
        );
        record_request(5, &ResponsePayload::failed("boom"));
        let after = snapshot();

        // other tests may record concurrently; counters only grow
        assert!(after.total_requests >= before.total_requests + 2);
        assert!(after.failed_requests >= before.failed_requests + 1);
        assert!(after.feed_errors >= before.feed_errors + 1);
        assert!(after.rolling_avg_ms.is_some());
    }
}
