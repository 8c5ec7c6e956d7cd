//! Decoding of feed-to-JSON converter responses.
//!
//! The converter wraps one feed as
//! `{status, feed: {title}, items: [{title, pubDate, link, description}]}`.
//! Anything but `status == "ok"` is a failure for that source.

use serde::Deserialize;

use super::{parse_timestamp, FeedError, FeedItem, FetchedFeed};
use crate::util::strip_control_chars;

#[derive(Deserialize)]
struct ConverterResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    feed: Option<ConverterFeed>,
    #[serde(default)]
    items: Vec<ConverterItem>,
}

#[derive(Deserialize)]
struct ConverterFeed {
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct ConverterItem {
    #[serde(default)]
    title: String,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
}

/// Decode a converter body into a feed.
///
/// # Errors
///
/// - [`FeedError::Parse`] - body is not the converter's JSON shape
/// - [`FeedError::BadStatus`] - converter reported a status other than `"ok"`
pub fn parse_converter_response(bytes: &[u8]) -> Result<FetchedFeed, FeedError> {
    let response: ConverterResponse =
        serde_json::from_slice(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;

    if response.status != "ok" {
        return Err(FeedError::BadStatus {
            status: response.status,
            message: response.message.unwrap_or_default(),
        });
    }

    let title = response
        .feed
        .map(|f| strip_control_chars(f.title.trim()).into_owned())
        .unwrap_or_default();

    let items = response
        .items
        .into_iter()
        .map(|item| FeedItem {
            title: strip_control_chars(item.title.trim()).into_owned(),
            description: strip_control_chars(&item.description).into_owned(),
            link: item.link.trim().to_string(),
            published: item.pub_date.as_deref().and_then(parse_timestamp),
        })
        .collect();

    Ok(FetchedFeed { title, items })
}
