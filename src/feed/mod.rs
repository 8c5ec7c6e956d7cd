//! Feed aggregation.
//!
//! Sources are fetched either through a feed-to-JSON converter service or
//! directly (RSS/Atom parsed locally), then merged into one list ordered by
//! publication time.

pub mod aggregator;
pub mod converter;
pub mod fetcher;
pub mod parser;

use chrono::{DateTime, NaiveDateTime};
use std::sync::Arc;
use thiserror::Error;

use crate::util::{excerpt, strip_html, EndpointError};

pub use aggregator::{merge_articles, FeedAggregator, RefreshOutcome, MAX_ARTICLES};
pub use fetcher::{FeedFetcher, SourceResult};

/// Characters of description shown per article.
pub const EXCERPT_CHARS: usize = 200;

/// Errors fetching or decoding a single feed source.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body could not be decoded as converter JSON or RSS/Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Converter answered but reported a failure
    #[error("Converter reported status {status:?}: {message}")]
    BadStatus { status: String, message: String },
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Bad converter endpoint: {0}")]
    Endpoint(#[from] EndpointError),
}

/// One entry as decoded from a source, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Unix seconds; `None` when the source gave no parseable date.
    pub published: Option<i64>,
}

/// A decoded feed: its display title and entries in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFeed {
    pub title: String,
    pub items: Vec<FeedItem>,
}

/// A merged article, tagged with the feed it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub link: String,
    pub published: Option<i64>,
    pub source: Arc<str>,
}

impl Article {
    /// Description with markup removed, cut to [`EXCERPT_CHARS`] with "..."
    /// appended. Empty when the article has no description.
    pub fn excerpt(&self) -> String {
        if self.description.is_empty() {
            return String::new();
        }
        let text = strip_html(&self.description);
        match text.char_indices().nth(EXCERPT_CHARS) {
            Some(_) => excerpt(&text, EXCERPT_CHARS).into_owned(),
            None => format!("{}...", text),
        }
    }
}

/// Parse a publication date as found in feeds and converter output.
///
/// Accepts RFC 3339, RFC 2822 and `YYYY-MM-DD HH:MM:SS` (taken as UTC, which
/// is what the converter emits).
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }

    tracing::debug!(value = %raw, "Unparseable publication date");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article(description: &str) -> Article {
        Article {
            title: "t".into(),
            description: description.into(),
            link: "https://example.com".into(),
            published: None,
            source: Arc::from("Example"),
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-03-01T12:00:00Z"), Some(1_709_294_400));
        assert_eq!(
            parse_timestamp("Fri, 01 Mar 2024 12:00:00 +0000"),
            Some(1_709_294_400)
        );
        assert_eq!(parse_timestamp("2024-03-01 12:00:00"), Some(1_709_294_400));
    }

    #[test]
    fn test_parse_timestamp_respects_offset() {
        assert_eq!(
            parse_timestamp("2024-03-01T13:00:00+01:00"),
            Some(1_709_294_400)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45 99:00:00"), None);
    }

    #[test]
    fn test_excerpt_strips_markup_and_appends_ellipsis() {
        assert_eq!(article("<p>Short &amp; sweet</p>").excerpt(), "Short & sweet...");
    }

    #[test]
    fn test_excerpt_long_description_cut_at_200() {
        let long = "a".repeat(500);
        let text = article(&long).excerpt();
        assert_eq!(text.chars().count(), 203);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_excerpt_empty_description() {
        assert_eq!(article("").excerpt(), "");
    }
}
