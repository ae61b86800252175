//! Ephemeral per-request session state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use deskpilot_types::{ChatMessage, ConversationMessage};

use crate::cancel::CancelToken;

/// One agent session: history, step counter, cancellation flag.
///
/// Created at request start, dropped when the stream ends; never persisted.
/// The session exclusively owns its sandbox connection for its duration.
#[derive(Debug)]
pub struct AgentSession {
    /// Session identifier, used in logs only.
    pub id: Uuid,
    /// Provider-boundary conversation history, most recent last.
    pub history: Vec<ChatMessage>,
    /// Tool-invocation steps taken so far.
    pub steps_taken: u32,
    /// Shared cancellation flag.
    pub cancel: CancelToken,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

impl AgentSession {
    /// Build a session from the inbound conversation history.
    pub fn new(messages: Vec<ConversationMessage>, cancel: CancelToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: messages.into_iter().map(ChatMessage::from).collect(),
            steps_taken: 0,
            cancel,
            started_at: Utc::now(),
        }
    }

    /// Whether the caller has signaled cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_inbound_history() {
        let session = AgentSession::new(
            vec![ConversationMessage::user("open a terminal")],
            CancelToken::new(),
        );
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].text(), "open a terminal");
        assert_eq!(session.steps_taken, 0);
        assert!(!session.is_cancelled());
    }
}
