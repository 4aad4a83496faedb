// src/ingest/parse.rs
//! Feed body → `RawFeedItem`s, via `feed-rs` (RSS 0.9x/1.0/2.0, Atom, JSON Feed).

use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;

use crate::ingest::types::RawFeedItem;

pub const NO_TITLE: &str = "(no title)";

/// Parsed feed: its items plus the label to fall back on when attributing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub items: Vec<RawFeedItem>,
}

/// Render a timestamp the way browsers serialize dates (`2024-05-01T12:00:00.000Z`).
pub fn iso_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a feed document. `url` is the fallback feed title; `now` is the fallback date.
pub fn parse_feed(
    bytes: &[u8],
    url: &str,
    now: DateTime<Utc>,
) -> Result<ParsedFeed, parser::ParseFeedError> {
    // feed-rs invents ids for entries without a guid; keep them empty so a missing
    // guid never turns into a synthetic link.
    let feed = parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build()
        .parse(bytes)?;

    let title = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.to_string());

    let items = feed
        .entries
        .into_iter()
        .map(|entry| to_raw_item(entry, &title, now))
        .collect();

    Ok(ParsedFeed { title, items })
}

fn to_raw_item(entry: Entry, feed_title: &str, now: DateTime<Utc>) -> RawFeedItem {
    let link = entry
        .links
        .iter()
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| entry.id.trim().to_string());

    let title = entry
        .title
        .map(|t| t.content)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let created_at = iso_millis(entry.published.or(entry.updated).unwrap_or(now));

    RawFeedItem {
        title,
        link,
        created_at,
        source_title: feed_title.to_string(),
    }
}
