use futures::stream::{self, StreamExt};
use std::time::Duration;

use super::converter::parse_converter_response;
use super::parser::parse_feed;
use super::{FeedError, FetchedFeed};
use crate::config::FeedMode;
use crate::util::{read_limited_bytes, with_query, BodyError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_CONCURRENT_FETCHES: usize = 10;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

impl From<BodyError> for FeedError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::Network(e) => FeedError::Network(e),
            BodyError::TooLarge(_) => FeedError::ResponseTooLarge,
        }
    }
}

/// Outcome of fetching one source. Carries the source so results can be
/// reported per feed.
#[derive(Debug)]
pub struct SourceResult {
    pub source: String,
    pub result: Result<FetchedFeed, FeedError>,
}

/// Fetches feed sources, either through the converter service or directly.
///
/// Cheap to clone: the HTTP client is reference counted.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    http: reqwest::Client,
    mode: FeedMode,
    converter_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl FeedFetcher {
    pub fn new(http: reqwest::Client, mode: FeedMode, converter_url: impl Into<String>) -> Self {
        Self {
            http,
            mode,
            converter_url: converter_url.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override how often and how quickly 429/5xx responses are retried.
    /// The delay doubles after each attempt.
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = base_delay;
        self
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    /// Fetch every source with bounded concurrency.
    ///
    /// Results come back in source order, one per source. A failing source
    /// never affects the others.
    pub async fn fetch_all(&self, sources: &[String]) -> Vec<SourceResult> {
        stream::iter(sources.iter().cloned())
            .map(|source| async move {
                let result = self.fetch(&source).await;
                if let Err(e) = &result {
                    tracing::warn!(source = %source, error = %e, "Feed fetch failed");
                }
                SourceResult { source, result }
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await
    }

    /// Fetch and decode a single source.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Endpoint`] - converter URL is unusable
    /// - [`FeedError::Network`] / [`FeedError::Timeout`] - transport failure
    /// - [`FeedError::HttpStatus`] - non-2xx, after retries for 429/5xx
    /// - [`FeedError::ResponseTooLarge`] - body exceeded 10MB
    /// - [`FeedError::Parse`] / [`FeedError::BadStatus`] - undecodable body
    pub async fn fetch(&self, source: &str) -> Result<FetchedFeed, FeedError> {
        let url = match self.mode {
            FeedMode::Converter => with_query(&self.converter_url, "rss_url", source)?.to_string(),
            FeedMode::Direct => source.to_string(),
        };

        let bytes = self.get_with_retry(&url).await?;

        let mut feed = match self.mode {
            FeedMode::Converter => parse_converter_response(&bytes)?,
            FeedMode::Direct => parse_feed(&bytes)?,
        };

        if feed.title.is_empty() {
            feed.title = source.to_string();
        }

        tracing::debug!(source = %source, items = feed.items.len(), "Feed fetched");
        Ok(feed)
    }

    async fn get_with_retry(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let mut retry_count = 0;

        loop {
            let response = tokio::time::timeout(REQUEST_TIMEOUT, self.http.get(url).send())
                .await
                .map_err(|_| FeedError::Timeout)??;

            let status = response.status();
            let retryable =
                status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

            if retryable && retry_count < self.max_retries {
                let delay = self.retry_delay * 2u32.pow(retry_count);
                tracing::warn!(
                    url = %url,
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Feed server busy, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FeedError::HttpStatus(status.as_u16()));
            }

            return Ok(read_limited_bytes(response, MAX_FEED_SIZE).await?);
        }
    }
}
