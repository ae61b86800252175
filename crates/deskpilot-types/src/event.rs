//! The unified event protocol streamed to clients.
//!
//! Every adapter, regardless of vendor, emits this one vocabulary. Ordering
//! invariants: an `ActionProposed` always precedes its matching
//! `ActionCompleted`/`Error`, and `Done` is terminal -- nothing follows it in
//! a session.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// A progress event in an agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Free-form model reasoning or commentary.
    Reasoning { text: String },
    /// The model proposed an action; execution follows.
    ActionProposed { action: Action },
    /// The most recently proposed action completed successfully.
    ActionCompleted {},
    /// A recoverable or fatal error, depending on adapter policy.
    Error { message: String },
    /// The sandbox backing this session is ready to be viewed.
    SandboxReady {
        sandbox_id: String,
        view_url: String,
    },
    /// Terminal event; the session is over.
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Event {
    /// Whether this event terminates the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Done { .. })
    }
}
