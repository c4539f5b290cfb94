//! Input capture (mouse, keyboard)
//!
//! Records pointer moves, clicks, scrolls and key presses from an input
//! device into an ordered, time-stamped buffer. Mouse moves are throttled so
//! continuous motion does not swamp the buffer.

pub mod channel;
pub mod keys;
pub mod types;

pub use channel::{CaptureBuffer, InputCaptureChannel};
pub use keys::{KeySymbol, Modifier, NamedKey};
pub use types::{EventKind, MouseButton, RecordedEvent};
