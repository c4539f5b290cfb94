//! In-memory device for tests: records synthesis calls and lets tests inject
//! notifications.

use super::{
    DeviceError, DeviceListener, DeviceResult, Hotkey, HotkeyCallback, InputDevice,
    SubscriptionHandle,
};
use crate::capture::input::keys::{KeySymbol, Modifier};
use crate::capture::input::types::MouseButton;
use parking_lot::Mutex as ParkingMutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum Synthesized {
    MoveTo(f64, f64),
    Press(MouseButton),
    Release(MouseButton),
    Scroll(i64, i64),
    KeyDown(KeySymbol),
    KeyUp(KeySymbol),
}

pub struct FakeDevice {
    supports_hotkeys: bool,
    fail_scroll: AtomicBool,
    move_delay: ParkingMutex<Duration>,
    next_handle: AtomicU64,
    listeners: ParkingMutex<HashMap<u64, Arc<dyn DeviceListener>>>,
    hotkeys: ParkingMutex<HashMap<u64, (Hotkey, HotkeyCallback)>>,
    held: ParkingMutex<BTreeSet<Modifier>>,
    calls: ParkingMutex<Vec<(Instant, Synthesized)>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::with_hotkeys(true)
    }

    pub fn with_hotkeys(supports_hotkeys: bool) -> Self {
        Self {
            supports_hotkeys,
            fail_scroll: AtomicBool::new(false),
            move_delay: ParkingMutex::new(Duration::ZERO),
            next_handle: AtomicU64::new(1),
            listeners: ParkingMutex::new(HashMap::new()),
            hotkeys: ParkingMutex::new(HashMap::new()),
            held: ParkingMutex::new(BTreeSet::new()),
            calls: ParkingMutex::new(Vec::new()),
        }
    }

    pub fn fail_scroll(&self, fail: bool) {
        self.fail_scroll.store(fail, Ordering::SeqCst);
    }

    /// Make every pointer move block for `delay` before it is recorded.
    pub fn slow_moves(&self, delay: Duration) {
        *self.move_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<Synthesized> {
        self.calls.lock().iter().map(|(_, call)| call.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Synthesized)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn hotkey_count(&self) -> usize {
        self.hotkeys.lock().len()
    }

    fn listeners(&self) -> Vec<Arc<dyn DeviceListener>> {
        self.listeners.lock().values().cloned().collect()
    }

    pub fn emit_click(&self, x: f64, y: f64, button: MouseButton, pressed: bool) {
        for listener in self.listeners() {
            listener.on_click(x, y, button.clone(), pressed);
        }
    }

    pub fn emit_move(&self, x: f64, y: f64) {
        for listener in self.listeners() {
            listener.on_move(x, y);
        }
    }

    pub fn emit_scroll(&self, x: f64, y: f64, dx: i64, dy: i64) {
        for listener in self.listeners() {
            listener.on_scroll(x, y, dx, dy);
        }
    }

    pub fn emit_key_down(&self, key: KeySymbol) {
        let held = {
            let mut held = self.held.lock();
            if let Some(modifier) = key.modifier() {
                held.insert(modifier);
            }
            held.clone()
        };

        let fired: Vec<HotkeyCallback> = self
            .hotkeys
            .lock()
            .values()
            .filter(|(hotkey, _)| hotkey.is_triggered_by(&key, &held))
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in fired {
            callback();
        }

        for listener in self.listeners() {
            listener.on_key_down(key);
        }
    }

    pub fn emit_key_up(&self, key: KeySymbol) {
        if let Some(modifier) = key.modifier() {
            self.held.lock().remove(&modifier);
        }
        for listener in self.listeners() {
            listener.on_key_up(key);
        }
    }

    fn push(&self, call: Synthesized) {
        self.calls.lock().push((Instant::now(), call));
    }

    fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }
}

impl InputDevice for FakeDevice {
    fn name(&self) -> &str {
        "fake"
    }

    fn subscribe(&self, listener: Arc<dyn DeviceListener>) -> DeviceResult<SubscriptionHandle> {
        let handle = self.handle();
        self.listeners.lock().insert(handle.0, listener);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.listeners.lock().remove(&handle.0);
        self.hotkeys.lock().remove(&handle.0);
    }

    fn move_pointer_to(&self, x: f64, y: f64) -> DeviceResult<()> {
        let delay = *self.move_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.push(Synthesized::MoveTo(x, y));
        Ok(())
    }

    fn press_button(&self, button: MouseButton) -> DeviceResult<()> {
        self.push(Synthesized::Press(button));
        Ok(())
    }

    fn release_button(&self, button: MouseButton) -> DeviceResult<()> {
        self.push(Synthesized::Release(button));
        Ok(())
    }

    fn scroll(&self, dx: i64, dy: i64) -> DeviceResult<()> {
        if self.fail_scroll.load(Ordering::SeqCst) {
            return Err(DeviceError::Synthesis("scroll rejected".to_string()));
        }
        self.push(Synthesized::Scroll(dx, dy));
        Ok(())
    }

    fn press_key(&self, key: KeySymbol) -> DeviceResult<()> {
        self.push(Synthesized::KeyDown(key));
        Ok(())
    }

    fn release_key(&self, key: KeySymbol) -> DeviceResult<()> {
        self.push(Synthesized::KeyUp(key));
        Ok(())
    }

    fn subscribe_hotkey(
        &self,
        hotkey: &Hotkey,
        callback: HotkeyCallback,
    ) -> DeviceResult<SubscriptionHandle> {
        if !self.supports_hotkeys {
            return Err(DeviceError::Unsupported(format!("global hotkey {}", hotkey)));
        }
        let handle = self.handle();
        self.hotkeys.lock().insert(handle.0, (hotkey.clone(), callback));
        Ok(handle)
    }
}
