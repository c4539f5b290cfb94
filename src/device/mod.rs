//! Input device capability
//!
//! The OS-level global input hook and injection layer sits behind the
//! [`InputDevice`] trait. Capture subscribes a [`DeviceListener`]; replay
//! calls the synthesis methods; the loop-cancellation listener asks for
//! global hotkeys and degrades to a plain key subscription when the backend
//! cannot provide them.

mod hotkey;
pub mod noop;

#[cfg(feature = "rdev")]
pub mod native;

#[cfg(test)]
pub mod fake;

pub use hotkey::Hotkey;
pub use noop::NoopDevice;

use crate::capture::input::keys::KeySymbol;
use crate::capture::input::types::MouseButton;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a device backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Not supported by this input backend: {0}")]
    Unsupported(String),

    #[error("Input hook error: {0}")]
    Hook(String),

    #[error("Input synthesis failed: {0}")]
    Synthesis(String),

    #[error("Unknown key: {0:?}")]
    UnknownKey(String),

    #[error("Unknown mouse button: {0}")]
    UnknownButton(String),

    #[error("Invalid hotkey: {0}")]
    InvalidHotkey(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Opaque handle returned by subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Receiver for device notifications.
///
/// Callbacks run on whatever thread the backend delivers them on. Every
/// method defaults to ignoring the notification.
pub trait DeviceListener: Send + Sync {
    fn on_click(&self, _x: f64, _y: f64, _button: MouseButton, _pressed: bool) {}

    fn on_move(&self, _x: f64, _y: f64) {}

    fn on_scroll(&self, _x: f64, _y: f64, _dx: i64, _dy: i64) {}

    fn on_key_down(&self, _key: KeySymbol) {}

    fn on_key_up(&self, _key: KeySymbol) {}
}

/// Callback invoked when a hotkey fires.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync>;

/// Global input hook and synthesis capability.
pub trait InputDevice: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn subscribe(&self, listener: Arc<dyn DeviceListener>) -> DeviceResult<SubscriptionHandle>;

    /// Unsubscribing an unknown handle is a no-op.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    fn move_pointer_to(&self, x: f64, y: f64) -> DeviceResult<()>;

    fn press_button(&self, button: MouseButton) -> DeviceResult<()>;

    fn release_button(&self, button: MouseButton) -> DeviceResult<()>;

    fn scroll(&self, dx: i64, dy: i64) -> DeviceResult<()>;

    fn press_key(&self, key: KeySymbol) -> DeviceResult<()>;

    fn release_key(&self, key: KeySymbol) -> DeviceResult<()>;

    /// Register a global hotkey. Backends without hotkey support keep the
    /// default, which reports [`DeviceError::Unsupported`].
    fn subscribe_hotkey(
        &self,
        hotkey: &Hotkey,
        _callback: HotkeyCallback,
    ) -> DeviceResult<SubscriptionHandle> {
        Err(DeviceError::Unsupported(format!("global hotkey {}", hotkey)))
    }
}
