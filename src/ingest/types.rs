// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// One item as parsed from a single feed response, before attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawFeedItem {
    pub title: String,
    pub link: String,          // link href, else guid, else ""
    pub created_at: String,    // ISO-ish; may be unparseable
    pub source_title: String,  // feed title, else the feed URL
}

/// Item as it leaves the aggregator. `source` is the calendar entry name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub title: String,
    pub link: String,
    pub created_at: String,
    pub source: String,
}

impl NormalizedItem {
    /// Link when present, otherwise `t:<title>`.
    pub fn dedup_key(&self) -> String {
        if self.link.is_empty() {
            format!("t:{}", self.title)
        } else {
            self.link.clone()
        }
    }
}

/// Outcome of fetching one URL. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success {
        items: Vec<RawFeedItem>,
        feed_title: String,
    },
    Failure {
        error: String,
    },
}

impl FetchResult {
    pub fn failure(error: impl Into<String>) -> Self {
        FetchResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }
}

/// A URL paired with the calendar entry it is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTarget {
    pub url: String,
    pub source: String,
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse one feed. Must not panic on bad input and must not return early
    /// with an error: every failure is reported as `FetchResult::Failure`.
    async fn fetch(&self, url: &str) -> FetchResult;
}
