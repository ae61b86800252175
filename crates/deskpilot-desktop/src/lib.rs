//! Remote desktop side of the orchestration core.
//!
//! [`DesktopSurface`] is the capability surface a sandbox exposes (clicks,
//! keys, screenshots, shell). [`ResolutionScaler`] maps between the model's
//! declared viewport and the real screen. [`ActionExecutor`] applies a
//! validated [`deskpilot_types::Action`] to a surface and always returns a
//! structured outcome, never an escaped error.

pub mod executor;
pub mod scaler;
pub mod surface;

pub use executor::{ActionExecutor, ExecLimits};
pub use scaler::ResolutionScaler;
pub use surface::{DesktopError, DesktopSurface};
