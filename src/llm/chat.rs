use secrecy::SecretString;

use super::{ChatMessage, CompletionClient, CompletionError, MISSING_CREDENTIAL};
use crate::status::{Slot, StatusReporter};
use crate::storage::{Database, CHAT_HISTORY_CAP};

/// Shown in the transcript when a turn fails. Never persisted.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Status while a reply is pending and another send is attempted.
pub const BUSY: &str = "Please wait for the current reply";

/// A conversation with the completion endpoint.
///
/// `history` is the persisted context sent with every turn (at most
/// [`CHAT_HISTORY_CAP`] messages). `transcript` is what the panel shows: it
/// also holds apologies for failed turns and is never trimmed.
///
/// A turn is split in two so the front end can run the request in a
/// background task: [`begin_turn`](Self::begin_turn) updates the transcript
/// and returns the request; [`finish_turn`](Self::finish_turn) applies the
/// outcome. [`send`](Self::send) runs both back to back.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    transcript: Vec<ChatMessage>,
    in_flight: bool,
}

impl ChatSession {
    /// Resume from persisted history. The transcript starts with it so the
    /// context being sent is visible.
    pub fn new(history: Vec<ChatMessage>) -> Self {
        Self {
            transcript: history.clone(),
            history,
            in_flight: false,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Start a turn.
    ///
    /// Returns the messages to send (persisted history plus the new user
    /// message), or `None` if the turn cannot start: blank input (silently),
    /// no credential, or a reply still pending.
    pub fn begin_turn(
        &mut self,
        input: &str,
        has_credential: bool,
        status: &StatusReporter,
    ) -> Option<Vec<ChatMessage>> {
        let message = input.trim();
        if message.is_empty() {
            return None;
        }
        if !has_credential {
            status.error(Slot::Chat, MISSING_CREDENTIAL);
            return None;
        }
        if self.in_flight {
            status.info(Slot::Chat, BUSY);
            return None;
        }

        let user = ChatMessage::user(message);
        self.transcript.push(user.clone());
        self.in_flight = true;
        status.info(Slot::Chat, "Thinking...");

        let mut request = self.history.clone();
        request.push(user);
        Some(request)
    }

    /// Apply the outcome of the request returned by `begin_turn`.
    ///
    /// On a reply, returns the new history to persist: the request plus the
    /// reply, trimmed to the last [`CHAT_HISTORY_CAP`] messages. A response
    /// without content ends the turn quietly. A failure adds the apology to
    /// the transcript and reports `Error: <reason>`.
    pub fn finish_turn(
        &mut self,
        mut request: Vec<ChatMessage>,
        result: Result<Option<String>, CompletionError>,
        status: &StatusReporter,
    ) -> Option<&[ChatMessage]> {
        self.in_flight = false;

        match result {
            Ok(Some(reply)) => {
                let reply = ChatMessage::assistant(reply);
                self.transcript.push(reply.clone());
                request.push(reply);

                let start = request.len().saturating_sub(CHAT_HISTORY_CAP);
                request.drain(..start);
                self.history = request;

                status.clear(Slot::Chat);
                Some(&self.history)
            }
            Ok(None) => {
                status.clear(Slot::Chat);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat turn failed");
                status.error(Slot::Chat, format!("Error: {e}"));
                self.transcript.push(ChatMessage::assistant(APOLOGY));
                None
            }
        }
    }

    /// End a pending turn whose request never completed.
    pub fn abandon_turn(&mut self) {
        if self.in_flight {
            self.in_flight = false;
            self.transcript.push(ChatMessage::assistant(APOLOGY));
        }
    }

    /// Run a whole turn and persist the new history.
    pub async fn send(
        &mut self,
        client: &CompletionClient,
        credential: Option<&SecretString>,
        input: &str,
        db: &Database,
        status: &StatusReporter,
    ) {
        let Some(request) = self.begin_turn(input, credential.is_some(), status) else {
            return;
        };
        let Some(key) = credential else {
            return;
        };

        let result = client.complete(key, &request).await;
        if let Some(history) = self.finish_turn(request, result, status) {
            if let Err(e) = db.save_chat_history(history).await {
                tracing::warn!(error = %e, "Failed to persist chat history");
            }
        }
    }

    /// Forget the conversation, on screen and on disk.
    pub async fn clear(&mut self, db: &Database) -> anyhow::Result<()> {
        self.transcript.clear();
        self.history.clear();
        db.clear_chat_history().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blank_input_is_silent_noop() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::default();
        assert!(chat.begin_turn("   ", true, &status).is_none());
        assert!(chat.transcript().is_empty());
        assert!(status.current(Slot::Chat).is_none());
    }

    #[test]
    fn test_missing_credential_reports_error() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::default();
        assert!(chat.begin_turn("hello", false, &status).is_none());
        assert!(chat.transcript().is_empty());
        assert_eq!(status.current(Slot::Chat).unwrap().message, MISSING_CREDENTIAL);
    }

    #[test]
    fn test_begin_turn_shows_user_message_and_thinking() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::new(vec![ChatMessage::user("a"), ChatMessage::assistant("b")]);

        let request = chat.begin_turn(" next ", true, &status).unwrap();
        assert_eq!(request.len(), 3);
        assert_eq!(request[2], ChatMessage::user("next"));
        assert_eq!(chat.transcript().last().unwrap().content, "next");
        assert!(chat.is_in_flight());
        assert_eq!(status.current(Slot::Chat).unwrap().message, "Thinking...");
    }

    #[test]
    fn test_second_send_rejected_while_in_flight() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::default();
        chat.begin_turn("one", true, &status).unwrap();
        assert!(chat.begin_turn("two", true, &status).is_none());
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(status.current(Slot::Chat).unwrap().message, BUSY);
    }

    #[test]
    fn test_reply_extends_history_and_clears_status() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::default();
        let request = chat.begin_turn("hi", true, &status).unwrap();

        let persisted = chat
            .finish_turn(request, Ok(Some("hello!".into())), &status)
            .unwrap()
            .to_vec();

        assert_eq!(
            persisted,
            vec![ChatMessage::user("hi"), ChatMessage::assistant("hello!")]
        );
        assert_eq!(chat.transcript().len(), 2);
        assert!(!chat.is_in_flight());
        assert!(status.current(Slot::Chat).is_none());
    }

    #[test]
    fn test_history_trimmed_to_cap() {
        let status = StatusReporter::new();
        let seed: Vec<_> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("q{i}"))
                } else {
                    ChatMessage::assistant(format!("a{i}"))
                }
            })
            .collect();
        let mut chat = ChatSession::new(seed);

        let request = chat.begin_turn("latest", true, &status).unwrap();
        assert_eq!(request.len(), 11);
        chat.finish_turn(request, Ok(Some("reply".into())), &status);

        assert_eq!(chat.history().len(), CHAT_HISTORY_CAP);
        assert_eq!(chat.history()[0].content, "q2");
        assert_eq!(chat.history()[9].role, Role::Assistant);
    }

    #[test]
    fn test_failure_appends_apology_without_persisting() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::default();
        let request = chat.begin_turn("hi", true, &status).unwrap();

        let persisted = chat.finish_turn(request, Err(CompletionError::Timeout), &status);
        assert!(persisted.is_none());
        assert!(chat.history().is_empty());
        assert_eq!(chat.transcript().last().unwrap().content, APOLOGY);
        assert_eq!(
            status.current(Slot::Chat).unwrap().message,
            "Error: Request timed out"
        );
        assert!(!chat.is_in_flight());
    }

    #[test]
    fn test_empty_reply_ends_turn_quietly() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::default();
        let request = chat.begin_turn("hi", true, &status).unwrap();

        assert!(chat.finish_turn(request, Ok(None), &status).is_none());
        assert_eq!(chat.transcript().len(), 1);
        assert!(chat.history().is_empty());
        assert!(status.current(Slot::Chat).is_none());
    }

    #[test]
    fn test_abandon_turn_unblocks_next_send() {
        let status = StatusReporter::new();
        let mut chat = ChatSession::default();
        chat.begin_turn("hi", true, &status).unwrap();

        chat.abandon_turn();
        assert!(!chat.is_in_flight());
        assert_eq!(chat.transcript().last().unwrap().content, APOLOGY);
        assert!(chat.begin_turn("again", true, &status).is_some());
    }

    #[tokio::test]
    async fn test_clear_wipes_transcript_and_storage() {
        let db = Database::open(":memory:").await.unwrap();
        db.save_chat_history(&[ChatMessage::user("x")]).await.unwrap();
        let mut chat = ChatSession::new(db.load_chat_history().await.unwrap());

        chat.clear(&db).await.unwrap();
        assert!(chat.transcript().is_empty());
        assert!(db.load_chat_history().await.unwrap().is_empty());
    }
}
