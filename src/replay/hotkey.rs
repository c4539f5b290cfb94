//! Stop-key listener for loop playback.
//!
//! Global hotkeys are tried first. When the backend cannot register them the
//! listener falls back to a plain key subscription and watches for Escape
//! alone. Either way the callback fires at most once per listener.

use crate::capture::input::keys::KeySymbol;
use crate::config::StopKeys;
use crate::device::{DeviceListener, HotkeyCallback, InputDevice, SubscriptionHandle};
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which subscription path the listener ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerMode {
    Hotkeys,
    EscapeOnly,
    Unavailable,
}

pub struct HotkeyCancellationListener {
    device: Arc<dyn InputDevice>,
    handles: ParkingMutex<Vec<SubscriptionHandle>>,
    mode: ListenerMode,
}

impl HotkeyCancellationListener {
    /// Subscribe to the stop keys. Never fails: if neither path works the
    /// listener is inert and playback can still be stopped explicitly.
    pub fn start(
        device: Arc<dyn InputDevice>,
        keys: &StopKeys,
        on_stop: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let on_stop = Arc::new(on_stop);
        let callback: HotkeyCallback = Arc::new(move || {
            if !fired.swap(true, Ordering::SeqCst) {
                tracing::info!("Stop hotkey detected");
                on_stop();
            }
        });

        let mut handles = Vec::new();
        let rich = device
            .subscribe_hotkey(&keys.combo, callback.clone())
            .and_then(|combo| {
                handles.push(combo);
                device.subscribe_hotkey(&keys.escape, callback.clone())
            });

        let mode = match rich {
            Ok(escape) => {
                handles.push(escape);
                tracing::info!(
                    "Hotkey listener started: {} or {} to stop loop",
                    keys.combo,
                    keys.escape
                );
                ListenerMode::Hotkeys
            }
            Err(e) => {
                tracing::warn!("Could not start hotkey listener: {}", e);
                for handle in handles.drain(..) {
                    device.unsubscribe(handle);
                }

                let watcher = Arc::new(EscapeWatcher {
                    key: keys.escape.key(),
                    callback,
                });
                match device.subscribe(watcher) {
                    Ok(handle) => {
                        handles.push(handle);
                        tracing::info!("Basic keyboard listener started: {} to stop loop", keys.escape);
                        ListenerMode::EscapeOnly
                    }
                    Err(e) => {
                        tracing::warn!("Could not start keyboard listener: {}", e);
                        ListenerMode::Unavailable
                    }
                }
            }
        };

        Self {
            device,
            handles: ParkingMutex::new(handles),
            mode,
        }
    }

    pub fn mode(&self) -> ListenerMode {
        self.mode
    }

    /// Unsubscribe everything. Safe to call more than once.
    pub fn stop(&self) {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            self.device.unsubscribe(handle);
        }
        tracing::debug!("Hotkey listener stopped");
    }
}

impl Drop for HotkeyCancellationListener {
    fn drop(&mut self) {
        self.stop();
    }
}

struct EscapeWatcher {
    key: KeySymbol,
    callback: HotkeyCallback,
}

impl DeviceListener for EscapeWatcher {
    fn on_key_down(&self, key: KeySymbol) {
        if key.matches(&self.key) {
            (self.callback)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::keys::NamedKey;
    use crate::device::fake::FakeDevice;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        (count, move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_combo_fires_once() {
        let device = Arc::new(FakeDevice::new());
        let (count, on_stop) = counter();
        let listener = HotkeyCancellationListener::start(device.clone(), &StopKeys::default(), on_stop);
        assert_eq!(listener.mode(), ListenerMode::Hotkeys);
        assert_eq!(device.hotkey_count(), 2);

        device.emit_key_down(KeySymbol::Char('s'));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        device.emit_key_down(KeySymbol::Named(NamedKey::CtrlL));
        device.emit_key_down(KeySymbol::Char('s'));
        device.emit_key_down(KeySymbol::Char('s'));
        device.emit_key_down(KeySymbol::ESCAPE);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        listener.stop();
        assert_eq!(device.hotkey_count(), 0);
    }

    #[test]
    fn test_escape_fires_with_hotkeys() {
        let device = Arc::new(FakeDevice::new());
        let (count, on_stop) = counter();
        let _listener = HotkeyCancellationListener::start(device.clone(), &StopKeys::default(), on_stop);

        device.emit_key_down(KeySymbol::ESCAPE);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_falls_back_to_escape_only() {
        let device = Arc::new(FakeDevice::with_hotkeys(false));
        let (count, on_stop) = counter();
        let listener = HotkeyCancellationListener::start(device.clone(), &StopKeys::default(), on_stop);
        assert_eq!(listener.mode(), ListenerMode::EscapeOnly);
        assert_eq!(device.listener_count(), 1);

        device.emit_key_down(KeySymbol::Named(NamedKey::CtrlL));
        device.emit_key_down(KeySymbol::Char('s'));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        device.emit_key_down(KeySymbol::ESCAPE);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(listener);
        assert_eq!(device.listener_count(), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let device = Arc::new(FakeDevice::new());
        let (count, on_stop) = counter();
        let listener = HotkeyCancellationListener::start(device.clone(), &StopKeys::default(), on_stop);

        listener.stop();
        listener.stop();
        device.emit_key_down(KeySymbol::ESCAPE);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
