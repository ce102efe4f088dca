//! Test helpers for the acervo services
//!
//! An in-memory `DocumentTransport` with scripted failures, artificial latency and a call log,
//! plus document and file fixtures. No HTTP server is needed.

pub mod fixtures;
pub mod mock_transport;

pub use fixtures::*;
pub use mock_transport::{MockCall, MockTransport, ScriptedFailure};
