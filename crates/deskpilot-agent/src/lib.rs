//! Provider adapters and the agent loop.
//!
//! Three adapter families translate vendor protocols into the unified event
//! stream: vendor-native computer use, generic tool calling, and a free-text
//! JSON fallback for models with no tool support. The loop is bounded,
//! injects fresh screenshots, prunes stale history, and honors a cooperative
//! cancellation token at every suspension point.

pub mod adapters;
pub mod cancel;
pub mod client;
pub mod prompts;
pub mod pruning;
pub mod session;
pub mod sink;

pub use adapters::{
    create_adapter, select_adapter, AdapterDeps, AdapterKind, ProviderAdapter, CANCELLED_MESSAGE,
    MAX_STEPS,
};
pub use cancel::CancelToken;
pub use client::{ChatRequest, ChunkStream, FinishReason, ModelChunk, ModelClient, ToolDefinition};
pub use pruning::{prune_history, TOOL_KEEP_WINDOW};
pub use session::AgentSession;
pub use sink::EventSink;
