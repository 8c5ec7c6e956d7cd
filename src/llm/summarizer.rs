use chrono::{DateTime, Local};
use secrecy::SecretString;
use serde::Serialize;

use super::{ChatMessage, CompletionClient, MISSING_CREDENTIAL};
use crate::feed::Article;
use crate::status::{Severity, Slot, StatusReporter};

/// Heading of the summary block.
pub const SUMMARY_TITLE: &str = "AI News Summary";

const PROMPT_PREFIX: &str = "Please summarize today's news from these articles in a concise, easy-to-read format with key highlights:\n\n";

/// A generated digest of the current articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub generated_at: DateTime<Local>,
}

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            generated_at: Local::now(),
        }
    }
}

#[derive(Serialize)]
struct PromptArticle<'a> {
    title: &'a str,
    description: String,
}

/// Build the single-message prompt for `articles`.
///
/// Each article contributes its title and the same excerpt shown in the
/// list, as a pretty-printed JSON array. No articles gives `[]`.
pub fn build_prompt(articles: &[Article]) -> String {
    let entries: Vec<PromptArticle<'_>> = articles
        .iter()
        .map(|a| PromptArticle {
            title: &a.title,
            description: a.excerpt(),
        })
        .collect();

    // Serializing borrowed strs cannot fail.
    let json = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string());
    format!("{PROMPT_PREFIX}{json}")
}

/// Summarize `articles` with one completion request.
///
/// Without a credential this reports an error and sends nothing. A reply
/// with no content yields `None` silently; a failed request reports
/// "Error generating summary".
pub async fn summarize(
    client: &CompletionClient,
    credential: Option<&SecretString>,
    articles: &[Article],
    status: &StatusReporter,
) -> Option<Summary> {
    let Some(key) = credential else {
        status.report(MISSING_CREDENTIAL, Severity::Error, None);
        return None;
    };

    status.info(Slot::News, "Generating summary...");
    let messages = [ChatMessage::user(build_prompt(articles))];

    match client.complete(key, &messages).await {
        Ok(Some(text)) => {
            status.clear(Slot::News);
            tracing::info!(articles = articles.len(), "Summary generated");
            Some(Summary::new(text))
        }
        Ok(None) => {
            status.clear(Slot::News);
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Summary request failed");
            status.report("Error generating summary", Severity::Error, None);
            None
        }
    }
}
