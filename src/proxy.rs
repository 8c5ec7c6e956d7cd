//! Fetch an arbitrary URL through a relay endpoint.
//!
//! The relay is called as `GET {relay}?url={target}` and its body is shown
//! as text, pretty-printed when it is JSON.

use std::time::Duration;
use thiserror::Error;

use crate::status::{Slot, StatusReporter};
use crate::util::{read_limited_bytes, strip_control_chars, with_query, BodyError, EndpointError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Shown in the content area when a fetch fails.
pub const FETCH_FAILED: &str = "Failed to fetch content";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Please enter a URL")]
    EmptyUrl,
    #[error("{0}")]
    Endpoint(#[from] EndpointError),
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP {code}: {reason}")]
    HttpStatus { code: u16, reason: String },
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid JSON: {0}")]
    Decode(String),
}

impl From<BodyError> for ProxyError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::Network(e) => ProxyError::Network(e),
            BodyError::TooLarge(_) => ProxyError::ResponseTooLarge,
        }
    }
}

/// Client for the relay endpoint.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ProxyClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Fetch `target` through the relay and return the text to display.
    ///
    /// A `content-type` containing `application/json` is re-serialized with
    /// two-space indentation, keeping key order; anything else is returned
    /// as-is (lossy UTF-8). Terminal control sequences are stripped either way.
    pub async fn fetch(&self, target: &str) -> Result<String, ProxyError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ProxyError::EmptyUrl);
        }

        let url = with_query(&self.endpoint, "url", target)?;
        let response = tokio::time::timeout(REQUEST_TIMEOUT, self.http.get(url).send())
            .await
            .map_err(|_| ProxyError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::HttpStatus {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let bytes = read_limited_bytes(response, MAX_BODY_SIZE).await?;

        let text = if is_json {
            let value: serde_json::Value =
                serde_json::from_slice(&bytes).map_err(|e| ProxyError::Decode(e.to_string()))?;
            serde_json::to_string_pretty(&value).map_err(|e| ProxyError::Decode(e.to_string()))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };
        Ok(strip_control_chars(&text).into_owned())
    }

    /// Fetch with status reporting on the proxy slot.
    ///
    /// Returns the content to display: the body on success,
    /// [`FETCH_FAILED`] on failure, `None` for blank input (content left
    /// unchanged).
    pub async fn fetch_via_proxy(&self, target: &str, status: &StatusReporter) -> Option<String> {
        if target.trim().is_empty() {
            status.error(Slot::Proxy, ProxyError::EmptyUrl.to_string());
            return None;
        }

        status.info(Slot::Proxy, "Fetching...");
        match self.fetch(target).await {
            Ok(content) => {
                tracing::info!(target = %target.trim(), bytes = content.len(), "Proxy fetch complete");
                status.success(Slot::Proxy, "Content loaded successfully!");
                Some(content)
            }
            Err(e) => {
                tracing::warn!(target = %target.trim(), error = %e, "Proxy fetch failed");
                status.error(Slot::Proxy, format!("Error: {e}"));
                Some(FETCH_FAILED.to_string())
            }
        }
    }
}
