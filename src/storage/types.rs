use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of newsdeck appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map a sqlx error, recognising the lock conditions SQLite reports
    /// as plain messages (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

pub(crate) fn is_lock_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
        || lower.contains("sqlite_locked")
        || lower.contains("unable to open database file")
}

// ============================================================================
// Preference Keys
// ============================================================================

/// Stored completion API credential.
pub const KEY_API_KEY: &str = "api.key";
/// JSON array of the last chat messages.
pub const KEY_CHAT_HISTORY: &str = "chat.history";
/// JSON array of feed source URLs (only written with `persist_feeds`).
pub const KEY_FEED_SOURCES: &str = "feeds.sources";

/// Hard cap on persisted chat messages (messages, not turns).
pub const CHAT_HISTORY_CAP: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_detected() {
        assert!(is_lock_message("error returned from database: database is locked"));
        assert!(is_lock_message("SQLITE_BUSY"));
        assert!(!is_lock_message("no such table: user_preferences"));
    }
}
