// src/config/service.rs
use std::path::PathBuf;
use std::time::Duration;

use crate::calendar::loader::ENV_CALENDAR_PATH;
use crate::ingest::fetcher::{DEFAULT_FEED_TIMEOUT, DEFAULT_USER_AGENT};

pub const ENV_FEED_TIMEOUT_SECS: &str = "FEED_TIMEOUT_SECS";
pub const ENV_FEED_USER_AGENT: &str = "FEED_USER_AGENT";
pub const ENV_MAX_CONCURRENT_FETCHES: &str = "MAX_CONCURRENT_FETCHES";

/// Process-level settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Explicit calendar file; `None` means the loader's fallback chain.
    pub calendar_path: Option<PathBuf>,
    pub feed_timeout: Duration,
    pub user_agent: String,
    /// `None` = one fetch per selected URL, all at once.
    pub max_concurrent_fetches: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            calendar_path: None,
            feed_timeout: DEFAULT_FEED_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent_fetches: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key → value source. Bad values are logged and replaced by defaults.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let calendar_path = get(ENV_CALENDAR_PATH)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let feed_timeout = match get(ENV_FEED_TIMEOUT_SECS) {
            None => defaults.feed_timeout,
            Some(raw) => match parse_positive(&raw) {
                Some(secs) => Duration::from_secs(secs as u64),
                None => {
                    tracing::warn!(
                        key = ENV_FEED_TIMEOUT_SECS,
                        value = %raw,
                        "invalid value, using default"
                    );
                    defaults.feed_timeout
                }
            },
        };

        let user_agent = get(ENV_FEED_USER_AGENT)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.user_agent);

        let max_concurrent_fetches = match get(ENV_MAX_CONCURRENT_FETCHES) {
            None => None,
            Some(raw) => {
                let parsed = parse_positive(&raw);
                if parsed.is_none() {
                    tracing::warn!(
                        key = ENV_MAX_CONCURRENT_FETCHES,
                        value = %raw,
                        "invalid value, fan-out stays unbounded"
                    );
                }
                parsed
            }
        };

        Self {
            calendar_path,
            feed_timeout,
            user_agent,
            max_concurrent_fetches,
        }
    }
}

fn parse_positive(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
