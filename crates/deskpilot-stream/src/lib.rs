//! Session facade: one request in, one ordered event stream out.
//!
//! [`Streamer`] validates the provider configuration, picks the adapter
//! family, and drives the agent loop on a background task. Everything the
//! caller sees arrives through a single channel of [`deskpilot_types::Event`]
//! values ending in exactly one terminal event; [`encode`] renders those
//! events as NDJSON lines or SSE frames for the transport layer.

pub mod encode;
pub mod streamer;

pub use encode::{to_ndjson, to_sse_frame};
pub use streamer::{StreamRequest, Streamer};
