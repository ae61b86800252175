//! Conversation message shapes.
//!
//! [`ConversationMessage`] is the inbound request shape: user/assistant turns
//! whose content is plain text or ordered text/image parts. [`ChatMessage`]
//! is the richer internal shape the agent loop maintains and hands to
//! providers: it additionally carries tool calls and tool results, which the
//! history pruner later strips when they go stale.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Role of a conversation participant. Only these two cross the provider
/// boundary; system and bookkeeping roles are a client-side concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Content of an inbound conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Ordered sequence of text and image parts.
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { data: String, media_type: String },
}

/// An inbound user/assistant turn, as delivered by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ConversationMessage {
    /// Create a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a plain-text assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }
}

/// One part of an internal chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatPart {
    /// Text span (user task text, assistant reasoning, captions).
    Text { text: String },
    /// Base64-encoded image.
    Image { data: String, media_type: String },
    /// A tool call issued by the assistant.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The result of a tool call, fed back to the model.
    ToolResult {
        tool_call_id: String,
        content: String,
        /// Base64 screenshot attached to observe-style results.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
    },
}

/// An internal provider-boundary message: role plus ordered parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<ChatPart>,
}

impl ChatMessage {
    /// A user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ChatPart::Text { text: text.into() }],
        }
    }

    /// An assistant message with a single text part.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            parts: vec![ChatPart::Text { text: text.into() }],
        }
    }

    /// A user message pairing a caption with a PNG screenshot.
    pub fn user_with_screenshot(caption: impl Into<String>, png: &[u8]) -> Self {
        Self {
            role: Role::User,
            parts: vec![
                ChatPart::Text {
                    text: caption.into(),
                },
                ChatPart::Image {
                    data: B64.encode(png),
                    media_type: "image/png".to_string(),
                },
            ],
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let ChatPart::Text { text } = part {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// Whether the message carries no content at all.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl From<ConversationMessage> for ChatMessage {
    fn from(msg: ConversationMessage) -> Self {
        let parts = match msg.content {
            MessageContent::Text(text) => vec![ChatPart::Text { text }],
            MessageContent::Parts(parts) => parts
                .into_iter()
                .map(|p| match p {
                    ContentPart::Text { text } => ChatPart::Text { text },
                    ContentPart::Image { data, media_type } => {
                        ChatPart::Image { data, media_type }
                    }
                })
                .collect(),
        };
        Self {
            role: msg.role,
            parts,
        }
    }
}
