//! Replay engine for recorded macros.
//!
//! This module provides:
//! - `ReplayEngine` - background playback with speed, repeat and loop modes
//! - `CancelToken` - cooperative cancellation with interruptible waits
//! - `HotkeyCancellationListener` - stop keys for loop playback
//! - `execute_event` - synthesize a single recorded event
//!
//! # Example
//!
//! ```ignore
//! use macro_recorder::replay::ReplayEngine;
//!
//! let engine = ReplayEngine::new(device, StopKeys::default(), Duration::from_secs(5));
//!
//! // Twice as fast, three times
//! engine.play(events.clone(), 2.0, 3)?;
//! engine.wait_idle();
//!
//! // Until Ctrl+S / Esc, one second between passes
//! engine.play_loop(events, 1.0, 1.0)?;
//! ```

mod cancel;
mod dispatch;
mod engine;
mod hotkey;

pub use cancel::{CancelToken, Completion};
pub use dispatch::execute_event;
pub use engine::{ReplayEngine, ReplayState};
pub use hotkey::{HotkeyCancellationListener, ListenerMode};
