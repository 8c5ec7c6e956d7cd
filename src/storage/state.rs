//! Typed accessors for the three persisted entries: credential, chat history
//! and (optionally) feed sources. Each lives under its own preference key.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

use super::schema::Database;
use super::types::{CHAT_HISTORY_CAP, KEY_API_KEY, KEY_CHAT_HISTORY, KEY_FEED_SOURCES};
use crate::llm::ChatMessage;

impl Database {
    // ========================================================================
    // Credential
    // ========================================================================

    /// Load the stored credential. An empty stored value counts as absent.
    pub async fn load_credential(&self) -> Result<Option<SecretString>> {
        let value = self.get_preference(KEY_API_KEY).await?;
        Ok(value
            .filter(|v| !v.is_empty())
            .map(SecretString::from))
    }

    /// Store the credential as entered. Not validated.
    pub async fn save_credential(&self, key: &SecretString) -> Result<()> {
        self.set_preference(KEY_API_KEY, key.expose_secret()).await
    }

    // ========================================================================
    // Chat History
    // ========================================================================

    /// Load persisted chat history.
    ///
    /// A corrupt entry is logged and treated as empty rather than failing the
    /// whole session load.
    pub async fn load_chat_history(&self) -> Result<Vec<ChatMessage>> {
        let Some(raw) = self.get_preference(KEY_CHAT_HISTORY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => Ok(messages),
            Err(e) => {
                tracing::warn!(error = %e, "Stored chat history is corrupt, starting fresh");
                Ok(Vec::new())
            }
        }
    }

    /// Persist the last [`CHAT_HISTORY_CAP`] messages of `messages`.
    ///
    /// Returns the number of messages stored.
    pub async fn save_chat_history(&self, messages: &[ChatMessage]) -> Result<usize> {
        let start = messages.len().saturating_sub(CHAT_HISTORY_CAP);
        let kept = &messages[start..];
        let json = serde_json::to_string(kept).context("Failed to encode chat history")?;
        self.set_preference(KEY_CHAT_HISTORY, &json).await?;
        Ok(kept.len())
    }

    /// Forget the persisted chat history.
    pub async fn clear_chat_history(&self) -> Result<()> {
        self.delete_preference(KEY_CHAT_HISTORY).await?;
        Ok(())
    }

    // ========================================================================
    // Feed Sources
    // ========================================================================

    /// Load persisted feed sources, `None` if never saved.
    pub async fn load_feed_sources(&self) -> Result<Option<Vec<String>>> {
        let Some(raw) = self.get_preference(KEY_FEED_SOURCES).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(sources) => Ok(Some(sources)),
            Err(e) => {
                tracing::warn!(error = %e, "Stored feed sources are corrupt, using defaults");
                Ok(None)
            }
        }
    }

    /// Persist the feed source list.
    pub async fn save_feed_sources(&self, sources: &[String]) -> Result<()> {
        let json = serde_json::to_string(sources).context("Failed to encode feed sources")?;
        self.set_preference(KEY_FEED_SOURCES, &json).await
    }
}
