use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::ChatMessage;
use crate::util::{
    check_credential_endpoint, read_limited_bytes, strip_control_chars, BodyError, EndpointError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RESPONSE_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Errors from a completion request.
///
/// A well-formed response that simply carries no reply is not an error;
/// see [`CompletionClient::complete`].
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response
    #[error("HTTP {code}: {reason}")]
    HttpStatus { code: u16, reason: String },
    /// Body was not JSON
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Response too large")]
    ResponseTooLarge,
    /// Refused to send the credential to this endpoint
    #[error("{0}")]
    InsecureEndpoint(#[from] EndpointError),
}

impl From<BodyError> for CompletionError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::Network(e) => CompletionError::Network(e),
            BodyError::TooLarge(_) => CompletionError::ResponseTooLarge,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

// Every level is optional: a reply that lacks any of them is "no content",
// not a decode failure.
#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completion client.
///
/// Cheap to clone: the HTTP client is reference counted.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and return the first choice's reply text.
    ///
    /// Returns `Ok(None)` when the response decodes but has no first choice
    /// or no message content. Control sequences are stripped from the reply.
    ///
    /// # Errors
    ///
    /// - [`CompletionError::InsecureEndpoint`] - endpoint is not HTTPS (or local HTTP);
    ///   nothing is sent
    /// - [`CompletionError::Network`] / [`CompletionError::Timeout`] - transport failure
    /// - [`CompletionError::HttpStatus`] - non-2xx response
    /// - [`CompletionError::Decode`] - body is not a JSON object
    pub async fn complete(
        &self,
        api_key: &SecretString,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, CompletionError> {
        let url = check_credential_endpoint(&self.endpoint)?;

        let body = serde_json::to_vec(&CompletionRequest {
            model: &self.model,
            messages,
        })
        .map_err(|e| CompletionError::Decode(e.to_string()))?;

        tracing::debug!(
            endpoint = %url,
            model = %self.model,
            messages = messages.len(),
            "Sending completion request"
        );

        let request = self
            .http
            .post(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", api_key.expose_secret()),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .body(body);

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| CompletionError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::HttpStatus {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        let parsed: CompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| CompletionError::Decode(e.to_string()))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| strip_control_chars(&content).into_owned());

        if reply.is_none() {
            tracing::debug!("Completion response carried no reply content");
        }

        Ok(reply)
    }
}
