// src/calendar/select.rs
use crate::calendar::{CalendarRegistry, Tier};
use crate::ingest::types::FeedTarget;

pub const DEFAULT_TIERS: [&str; 3] = ["major", "mid", "light"];

/// Every non-empty `rss` feed of every entry whose tier was requested.
/// Registry order, then feed order within an entry.
pub fn select_urls<S: AsRef<str>>(registry: &CalendarRegistry, tiers: &[S]) -> Vec<FeedTarget> {
    let wanted: Vec<Tier> = tiers.iter().map(|t| Tier::from(t.as_ref())).collect();

    registry
        .entries()
        .iter()
        .filter(|ev| wanted.contains(&ev.tier))
        .flat_map(|ev| {
            ev.feeds
                .iter()
                .filter(|f| f.kind == "rss" && !f.url.is_empty())
                .map(move |f| FeedTarget {
                    url: f.url.clone(),
                    source: ev.name.clone(),
                })
        })
        .collect()
}
