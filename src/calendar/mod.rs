// src/calendar/mod.rs
//! # Calendar Registry
//!
//! Static list of calendar entries (events), each with a tier label and the feeds that
//! cover it. Loaded once at startup and shared read-only through `Arc<CalendarRegistry>`.

pub mod loader;
pub mod select;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use loader::{load_default, load_from};
pub use select::{select_urls, DEFAULT_TIERS};

/// Tier label. Unknown labels are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tier {
    Major,
    Mid,
    Light,
    Other(String),
}

impl Tier {
    pub fn as_str(&self) -> &str {
        match self {
            Tier::Major => "major",
            Tier::Mid => "mid",
            Tier::Light => "light",
            Tier::Other(s) => s,
        }
    }
}

impl From<String> for Tier {
    fn from(s: String) -> Self {
        match s.as_str() {
            "major" => Tier::Major,
            "mid" => Tier::Mid,
            "light" => Tier::Light,
            _ => Tier::Other(s),
        }
    }
}

impl From<&str> for Tier {
    fn from(s: &str) -> Self {
        Tier::from(s.to_string())
    }
}

impl From<Tier> for String {
    fn from(t: Tier) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    /// Only `"rss"` feeds are fetched; other kinds (ics, html, ...) are ignored.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
}

impl FeedDescriptor {
    pub fn rss(url: impl Into<String>) -> Self {
        Self {
            kind: "rss".to_string(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub name: String,
    pub tier: Tier,
    #[serde(default)]
    pub feeds: Vec<FeedDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarRegistry {
    entries: Vec<CalendarEntry>,
}

impl CalendarRegistry {
    pub fn from_entries(entries: Vec<CalendarEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
