//! Device that never delivers notifications and only logs synthesis calls.
//!
//! Used for dry runs and on builds without a native input backend.

use super::{DeviceListener, DeviceResult, InputDevice, SubscriptionHandle};
use crate::capture::input::keys::KeySymbol;
use crate::capture::input::types::MouseButton;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct NoopDevice {
    next_handle: AtomicU64,
}

impl NoopDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputDevice for NoopDevice {
    fn name(&self) -> &str {
        "noop"
    }

    fn subscribe(&self, _listener: Arc<dyn DeviceListener>) -> DeviceResult<SubscriptionHandle> {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        tracing::debug!("noop device: subscription {:?} will receive no events", handle);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        tracing::debug!("noop device: unsubscribe {:?}", handle);
    }

    fn move_pointer_to(&self, x: f64, y: f64) -> DeviceResult<()> {
        tracing::info!("[dry-run] move pointer to ({}, {})", x, y);
        Ok(())
    }

    fn press_button(&self, button: MouseButton) -> DeviceResult<()> {
        tracing::info!("[dry-run] press {} button", button);
        Ok(())
    }

    fn release_button(&self, button: MouseButton) -> DeviceResult<()> {
        tracing::info!("[dry-run] release {} button", button);
        Ok(())
    }

    fn scroll(&self, dx: i64, dy: i64) -> DeviceResult<()> {
        tracing::info!("[dry-run] scroll by ({}, {})", dx, dy);
        Ok(())
    }

    fn press_key(&self, key: KeySymbol) -> DeviceResult<()> {
        tracing::info!("[dry-run] press key {}", key);
        Ok(())
    }

    fn release_key(&self, key: KeySymbol) -> DeviceResult<()> {
        tracing::info!("[dry-run] release key {}", key);
        Ok(())
    }
}
