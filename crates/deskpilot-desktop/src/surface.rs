//! The remote desktop capability surface.
//!
//! Implemented by sandbox transports (WebSocket/HTTP device bridges) outside
//! this workspace; consumed by the [`crate::ActionExecutor`]. All coordinates
//! crossing this trait are in device space.

use async_trait::async_trait;
use thiserror::Error;

use deskpilot_types::{CommandOutput, ScrollDirection};

/// Errors surfaced by a desktop transport.
#[derive(Debug, Clone, Error)]
pub enum DesktopError {
    /// The transport to the sandbox failed.
    #[error("sandbox transport error: {detail}")]
    Transport { detail: String },

    /// Screen capture failed.
    #[error("screenshot capture failed: {detail}")]
    Screenshot { detail: String },

    /// A shell command could not be run (distinct from a nonzero exit).
    #[error("command execution failed: {detail}")]
    Command { detail: String },
}

/// A connected remote desktop.
///
/// One instance is exclusively owned by one session for its duration; the
/// orchestration loop is strictly sequential, so implementations need not
/// serialize concurrent calls themselves.
#[async_trait]
pub trait DesktopSurface: Send + Sync {
    async fn left_click(&self, x: i32, y: i32) -> Result<(), DesktopError>;
    async fn right_click(&self, x: i32, y: i32) -> Result<(), DesktopError>;
    async fn middle_click(&self, x: i32, y: i32) -> Result<(), DesktopError>;
    async fn double_click(&self, x: i32, y: i32) -> Result<(), DesktopError>;
    async fn move_mouse(&self, x: i32, y: i32) -> Result<(), DesktopError>;

    /// Press-move-release from one device point to another.
    async fn drag(&self, from: (i32, i32), to: (i32, i32)) -> Result<(), DesktopError>;

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DesktopError>;

    /// Type a chunk of literal text.
    async fn write(&self, text: &str) -> Result<(), DesktopError>;

    /// Press a key chord, e.g. "ctrl+shift+t".
    async fn press(&self, keys: &str) -> Result<(), DesktopError>;

    /// Capture the screen as raw image bytes at device resolution.
    async fn screenshot(&self) -> Result<Vec<u8>, DesktopError>;

    /// Run a shell command with a timeout in milliseconds.
    async fn run_command(
        &self,
        command: &str,
        timeout_ms: u64,
    ) -> Result<CommandOutput, DesktopError>;
}
