// src/ingest/aggregate.rs
//! Merge per-feed results into one capped, deduplicated, newest-first list.
//!
//! Steps, in order:
//! 1. failed feeds go to `errors` and contribute nothing;
//! 2. each feed keeps items at or after the cutoff, then at most `max_per_feed` of them
//!    in the feed's own order;
//! 3. picks are pooled in selector order;
//! 4. first occurrence of each dedup key wins;
//! 5. stable sort by creation time, newest first;
//! 6. truncate to [`MAX_ITEMS`].
//!
//! Dates that cannot be parsed count as "now" in both the cutoff and the sort.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::DEFAULT_TIERS;
use crate::ingest::types::{FeedTarget, FetchResult, NormalizedItem};

pub const MAX_ITEMS: usize = 120;
pub const DEFAULT_LOOKBACK_HOURS: f64 = 8760.0;
pub const DEFAULT_MAX_PER_FEED: usize = 10;

/// Request knobs after defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateParams {
    pub lookback_hours: f64,
    pub max_per_feed: usize,
    pub tiers: Vec<String>,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self {
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            max_per_feed: DEFAULT_MAX_PER_FEED,
            tiers: DEFAULT_TIERS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedErrorEntry {
    pub source: String,
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregationOutput {
    pub count: usize,
    pub items: Vec<NormalizedItem>,
    pub feeds_in_env: usize,
    pub errors: Vec<FeedErrorEntry>,
}

/// Milliseconds since the epoch for `s`, or for `now` when `s` is not a date we understand.
pub fn parse_date_safe(s: &str, now: DateTime<Utc>) -> i64 {
    parse_date(s.trim()).unwrap_or(now).timestamp_millis()
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `results[i]` must be the outcome of fetching `targets[i].url`.
pub fn aggregate(
    targets: &[FeedTarget],
    results: Vec<FetchResult>,
    params: &AggregateParams,
    now: DateTime<Utc>,
) -> AggregationOutput {
    let now_ms = now.timestamp_millis();
    let cutoff_ms = now_ms as f64 - params.lookback_hours * 3_600_000.0;

    let mut errors = Vec::new();
    let mut pool: Vec<NormalizedItem> = Vec::new();

    for (target, result) in targets.iter().zip(results) {
        let items = match result {
            FetchResult::Failure { error } => {
                errors.push(FeedErrorEntry {
                    source: target.source.clone(),
                    url: target.url.clone(),
                    error,
                });
                continue;
            }
            FetchResult::Success { items, .. } => items,
        };

        let picked = items
            .into_iter()
            .filter(|it| parse_date_safe(&it.created_at, now) as f64 >= cutoff_ms)
            .take(params.max_per_feed)
            .map(|it| NormalizedItem {
                title: it.title,
                link: it.link,
                created_at: it.created_at,
                source: target.source.clone(),
            });
        pool.extend(picked);
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(pool.len());
    let mut items: Vec<NormalizedItem> = pool
        .into_iter()
        .filter(|it| seen.insert(it.dedup_key()))
        .collect();

    // stable: ties keep pool order
    items.sort_by_cached_key(|it| Reverse(parse_date_safe(&it.created_at, now)));
    items.truncate(MAX_ITEMS);

    AggregationOutput {
        count: items.len(),
        items,
        feeds_in_env: targets.len(),
        errors,
    }
}
