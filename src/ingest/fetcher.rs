// src/ingest/fetcher.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use metrics::{counter, histogram};
use thiserror::Error;

use crate::ingest::parse::{parse_feed, ParsedFeed};
use crate::ingest::types::{FeedFetcher, FetchResult};

pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_USER_AGENT: &str = concat!("calendar-rss/", env!("CARGO_PKG_VERSION"));
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Why a single feed produced no items.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("response exceeds 10MB limit")]
    ResponseTooLarge,
    #[error("parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Fetches feeds over HTTP. One attempt per URL, bounded by `timeout`.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    /// Send + read + parse under one deadline. Expiry drops only this request.
    pub async fn fetch_parsed(&self, url: &str) -> Result<ParsedFeed, FeedError> {
        tokio::time::timeout(self.timeout, self.fetch_inner(url))
            .await
            .map_err(|_| FeedError::Timeout(self.timeout))?
    }

    async fn fetch_inner(&self, url: &str) -> Result<ParsedFeed, FeedError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        Ok(parse_feed(&bytes, url, chrono::Utc::now())?)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let t0 = Instant::now();
        let out = self.fetch_parsed(url).await;
        histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match out {
            Ok(feed) => {
                counter!("feeds_fetched_total").increment(1);
                tracing::debug!(url, items = feed.items.len(), "feed fetched");
                FetchResult::Success {
                    items: feed.items,
                    feed_title: feed.title,
                }
            }
            Err(e) => {
                counter!("feed_errors_total").increment(1);
                tracing::warn!(url, error = %e, "feed fetch failed");
                FetchResult::failure(e.to_string())
            }
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FeedError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
