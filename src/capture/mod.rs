//! Input capture
//!
//! The OS hook itself lives behind [`crate::device::InputDevice`]; this
//! module owns the recording session and the event model.

pub mod input;

pub use input::{EventKind, InputCaptureChannel, KeySymbol, MouseButton, RecordedEvent};
