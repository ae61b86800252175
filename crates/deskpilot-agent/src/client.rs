//! The model-provider capability surface.
//!
//! Vendor SDKs sit behind [`ModelClient`]: an opaque callable that takes a
//! system prompt, a message history, and tool definitions, and yields a
//! stream of normalized chunks. Provider adapters are the translators from
//! this shape into the internal event/action vocabulary; the raw HTTP/SSE
//! plumbing lives outside this workspace.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::json;

use deskpilot_types::Resolution;

/// A chunk of a streaming model response, normalized across vendors.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChunk {
    /// Incremental text (reasoning or final answer).
    TextDelta(String),
    /// A complete tool-call proposal.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// A vendor safety check requiring caller acknowledgment.
    SafetyCheck { id: String, message: String },
    /// The stream finished.
    Finished { reason: FinishReason },
}

/// Why a model turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of response.
    EndTurn,
    /// The model wants its tool calls executed.
    ToolUse,
    /// Output token limit reached.
    MaxTokens,
    /// A stop sequence matched.
    StopSequence,
}

/// A lazy stream of chunks; errors are vendor network/API failures.
pub type ChunkStream = BoxStream<'static, anyhow::Result<ModelChunk>>;

/// One turn's request to a provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// System/instructions string.
    pub system: String,
    /// Conversation history, most recent last.
    pub messages: Vec<deskpilot_types::ChatMessage>,
    /// Tool definitions offered this turn; empty for free-text protocols.
    pub tools: Vec<ToolDefinition>,
}

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for generic tools; a vendor-native marker object for
    /// first-party computer-use tools.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// The generic `computer` tool: input is the internal action wire shape.
    pub fn computer(model: Resolution) -> Self {
        Self {
            name: "computer".to_string(),
            description: format!(
                "Control a remote computer with a {model} screen. Propose exactly one \
                 action per call using the tagged JSON shape described by the schema.",
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": [
                            "click", "double_click", "right_click", "type", "keypress",
                            "scroll", "move", "drag", "wait", "screenshot", "shell_exec"
                        ]
                    },
                    "x": { "type": "number", "description": "X coordinate, 0-based" },
                    "y": { "type": "number", "description": "Y coordinate, 0-based" },
                    "button": { "type": "string", "enum": ["left", "right", "middle"] },
                    "text": { "type": "string" },
                    "keys": { "type": "array", "items": { "type": "string" } },
                    "direction": { "type": "string", "enum": ["up", "down", "left", "right"] },
                    "amount": { "type": "integer" },
                    "path": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": { "x": { "type": "number" }, "y": { "type": "number" } }
                        }
                    },
                    "duration_ms": { "type": "integer" },
                    "command": { "type": "string" },
                    "timeout_ms": { "type": "integer" }
                },
                "required": ["type"]
            }),
        }
    }

    /// The vendor-native computer-use tool marker (Anthropic style).
    pub fn native_computer(model: Resolution) -> Self {
        Self {
            name: "computer".to_string(),
            description: String::new(),
            input_schema: json!({
                "type": "computer_20250124",
                "display_width_px": model.width,
                "display_height_px": model.height,
            }),
        }
    }

    /// The vendor-native bash tool marker.
    pub fn native_bash() -> Self {
        Self {
            name: "bash".to_string(),
            description: String::new(),
            input_schema: json!({ "type": "bash_20250124" }),
        }
    }
}

/// A connected model provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Start one streaming turn. An `Err` here or inside the stream is a
    /// provider network/API failure; adapters treat it per their policy.
    async fn stream_chat(&self, request: ChatRequest) -> anyhow::Result<ChunkStream>;
}
