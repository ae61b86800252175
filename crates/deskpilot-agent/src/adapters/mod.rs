//! Provider adapters.
//!
//! - [`toolcall::ToolCallAdapter`]: generic function/tool-calling loop
//! - [`native::NativeComputerUseAdapter`]: vendor-native computer-use protocol
//! - [`json_fallback::JsonFallbackAdapter`]: free-text JSON for tool-less models
//!
//! Selection is a pure function of the provider configuration; construction
//! happens only after the configuration has validated.

pub mod json_fallback;
pub mod native;
pub mod toolcall;

use std::sync::Arc;

use async_trait::async_trait;

use deskpilot_desktop::ActionExecutor;
use deskpilot_types::{supports_native_tools, ProviderConfig, Vendor};

use crate::client::ModelClient;
use crate::session::AgentSession;
use crate::sink::EventSink;

/// Maximum tool-invocation steps per session.
pub const MAX_STEPS: u32 = 50;

/// Terminal message for caller-initiated cancellation.
pub const CANCELLED_MESSAGE: &str = "stopped by caller";

/// Which adapter family a configuration maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// Vendor first-party computer-use protocol.
    Native,
    /// Generic tool-calling agent loop.
    ToolCalling,
    /// Free-text JSON-in-prompt protocol.
    JsonFallback,
}

/// Map a validated configuration to an adapter family.
pub fn select_adapter(config: &ProviderConfig) -> AdapterKind {
    if config.native_computer_use && config.vendor == Vendor::Anthropic {
        AdapterKind::Native
    } else if supports_native_tools(&config.model) {
        AdapterKind::ToolCalling
    } else {
        AdapterKind::JsonFallback
    }
}

/// Collaborators shared by every adapter.
pub struct AdapterDeps {
    /// The vendor-backed model stream.
    pub client: Arc<dyn ModelClient>,
    /// Executor bound to this session's sandbox and scaler.
    pub executor: ActionExecutor,
    /// Model identifier for requests.
    pub model: String,
}

/// A running translation layer between one vendor protocol and the event
/// stream. Implementations call the validator/executor for every action the
/// model requests and uphold the event-ordering invariants via the sink.
#[async_trait]
pub trait ProviderAdapter: Send {
    /// Adapter family name, for logs.
    fn name(&self) -> &'static str;

    /// Drive the session to completion, emitting events through `sink`.
    ///
    /// Recoverable conditions are folded into the event stream; an `Err`
    /// return is reserved for programming defects and is fenced into a final
    /// `Error` event by the facade.
    async fn run(&mut self, session: &mut AgentSession, sink: &mut EventSink)
        -> anyhow::Result<()>;
}

/// Construct the adapter for a family.
pub fn create_adapter(kind: AdapterKind, deps: AdapterDeps) -> Box<dyn ProviderAdapter> {
    match kind {
        AdapterKind::Native => Box::new(native::NativeComputerUseAdapter::new(deps)),
        AdapterKind::ToolCalling => Box::new(toolcall::ToolCallAdapter::new(deps)),
        AdapterKind::JsonFallback => Box::new(json_fallback::JsonFallbackAdapter::new(deps)),
    }
}

/// Terminal message when the step budget runs out.
pub(crate) fn budget_message() -> String {
    format!("Reached the maximum of {MAX_STEPS} steps")
}
