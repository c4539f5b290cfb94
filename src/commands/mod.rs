//! Command handlers
//!
//! Async entry points a front-end (the bundled CLI, or any IPC layer) calls
//! with request payloads. Every handler reports failures in its response.

pub mod macros;
pub mod types;

pub use macros::MacroState;
