//! Core data model shared across the deskpilot crates.
//!
//! Everything a provider adapter, executor, or client needs to agree on lives
//! here: the closed [`Action`] vocabulary and its validator, the
//! [`ActionOutcome`] and [`Event`] protocols, conversation message shapes,
//! screen geometry, and provider configuration.

pub mod action;
pub mod config;
pub mod event;
pub mod geometry;
pub mod message;

pub use action::{
    validate_action, Action, ActionError, ActionOutcome, CommandOutput, MouseButton,
    ScrollDirection, MAX_COMMAND_BYTES,
};
pub use config::{supports_native_tools, supports_vision, ConfigError, ProviderConfig, Vendor};
pub use event::Event;
pub use geometry::{Point, Resolution, DEFAULT_MODEL_MAX_DIM};
pub use message::{ChatMessage, ChatPart, ContentPart, ConversationMessage, MessageContent, Role};
