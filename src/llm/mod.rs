//! Completion endpoint client and the two flows built on it: the news
//! summarizer and the chat session.

pub mod chat;
pub mod client;
pub mod summarizer;

use serde::{Deserialize, Serialize};

pub use chat::ChatSession;
pub use client::{CompletionClient, CompletionError};
pub use summarizer::{build_prompt, summarize, Summary, SUMMARY_TITLE};

/// Status shown when a credential-requiring flow runs without one.
pub const MISSING_CREDENTIAL: &str = "Please enter your API key first!";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a conversation, in the wire shape the completion
/// endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
