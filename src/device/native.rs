//! Native input backend built on `rdev`
//!
//! `rdev::listen` blocks its thread for the life of the process and cannot be
//! cancelled, so a single hook thread is started on the first subscription
//! and fans notifications out to whoever is subscribed at that moment.
//! Hotkeys are evaluated on the same thread from the tracked modifier state.

use super::{
    DeviceError, DeviceListener, DeviceResult, Hotkey, HotkeyCallback, InputDevice,
    SubscriptionHandle,
};
use crate::capture::input::keys::{KeySymbol, Modifier, NamedKey};
use crate::capture::input::types::MouseButton;
use parking_lot::Mutex as ParkingMutex;
use rdev::{Button, EventType, Key};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct HookState {
    listeners: HashMap<u64, Arc<dyn DeviceListener>>,
    hotkeys: HashMap<u64, (Hotkey, HotkeyCallback)>,
    held: BTreeSet<Modifier>,
    pointer: (f64, f64),
    started: bool,
    failed: Option<String>,
}

pub struct RdevDevice {
    state: Arc<ParkingMutex<HookState>>,
    next_handle: AtomicU64,
}

impl Default for RdevDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RdevDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(ParkingMutex::new(HookState::default())),
            next_handle: AtomicU64::new(1),
        }
    }

    fn ensure_hook_thread(&self) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.failed {
            return Err(DeviceError::Hook(reason.clone()));
        }
        if state.started {
            return Ok(());
        }

        let shared = self.state.clone();
        std::thread::Builder::new()
            .name("input-hook".to_string())
            .spawn(move || {
                tracing::info!("Global input hook started");
                let hook_state = shared.clone();
                if let Err(e) = rdev::listen(move |event| deliver(&hook_state, event.event_type)) {
                    tracing::error!("Global input hook failed: {:?}", e);
                    let mut state = shared.lock();
                    state.failed = Some(format!("{:?}", e));
                    state.started = false;
                }
            })
            .map_err(|e| DeviceError::Hook(e.to_string()))?;

        state.started = true;
        Ok(())
    }

    fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    fn simulate(event: EventType) -> DeviceResult<()> {
        rdev::simulate(&event)
            .map_err(|e| DeviceError::Synthesis(format!("{:?} ({:?})", event, e)))
    }
}

/// Runs on the hook thread. Callbacks are invoked after the state lock is
/// released so they may subscribe or unsubscribe.
fn deliver(state: &ParkingMutex<HookState>, event: EventType) {
    let (listeners, fired, pointer) = {
        let mut state = state.lock();
        if let EventType::MouseMove { x, y } = event {
            state.pointer = (x, y);
        }

        let mut fired = Vec::new();
        match event {
            EventType::KeyPress(key) => {
                if let Some(symbol) = symbol_from_key(key) {
                    if let Some(modifier) = symbol.modifier() {
                        state.held.insert(modifier);
                    }
                    fired = state
                        .hotkeys
                        .values()
                        .filter(|(hotkey, _)| hotkey.is_triggered_by(&symbol, &state.held))
                        .map(|(_, callback)| callback.clone())
                        .collect();
                }
            }
            EventType::KeyRelease(key) => {
                if let Some(modifier) = symbol_from_key(key).and_then(|s| s.modifier()) {
                    state.held.remove(&modifier);
                }
            }
            _ => {}
        }

        let listeners: Vec<_> = state.listeners.values().cloned().collect();
        (listeners, fired, state.pointer)
    };

    for callback in fired {
        callback();
    }

    let (x, y) = pointer;
    for listener in listeners {
        match event {
            EventType::MouseMove { x, y } => listener.on_move(x, y),
            EventType::ButtonPress(button) | EventType::ButtonRelease(button) => {
                if let Some(button) = button_from_rdev(button) {
                    listener.on_click(x, y, button, matches!(event, EventType::ButtonPress(_)));
                }
            }
            EventType::Wheel { delta_x, delta_y } => listener.on_scroll(x, y, delta_x, delta_y),
            EventType::KeyPress(key) => {
                if let Some(symbol) = symbol_from_key(key) {
                    listener.on_key_down(symbol);
                }
            }
            EventType::KeyRelease(key) => {
                if let Some(symbol) = symbol_from_key(key) {
                    listener.on_key_up(symbol);
                }
            }
        }
    }
}

impl InputDevice for RdevDevice {
    fn name(&self) -> &str {
        "rdev"
    }

    fn subscribe(&self, listener: Arc<dyn DeviceListener>) -> DeviceResult<SubscriptionHandle> {
        self.ensure_hook_thread()?;
        let handle = self.handle();
        self.state.lock().listeners.insert(handle.0, listener);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut state = self.state.lock();
        state.listeners.remove(&handle.0);
        state.hotkeys.remove(&handle.0);
    }

    fn move_pointer_to(&self, x: f64, y: f64) -> DeviceResult<()> {
        Self::simulate(EventType::MouseMove { x, y })
    }

    fn press_button(&self, button: MouseButton) -> DeviceResult<()> {
        Self::simulate(EventType::ButtonPress(button_to_rdev(button)?))
    }

    fn release_button(&self, button: MouseButton) -> DeviceResult<()> {
        Self::simulate(EventType::ButtonRelease(button_to_rdev(button)?))
    }

    fn scroll(&self, dx: i64, dy: i64) -> DeviceResult<()> {
        Self::simulate(EventType::Wheel {
            delta_x: dx,
            delta_y: dy,
        })
    }

    fn press_key(&self, key: KeySymbol) -> DeviceResult<()> {
        Self::simulate(EventType::KeyPress(key_from_symbol(key)?))
    }

    fn release_key(&self, key: KeySymbol) -> DeviceResult<()> {
        Self::simulate(EventType::KeyRelease(key_from_symbol(key)?))
    }

    fn subscribe_hotkey(
        &self,
        hotkey: &Hotkey,
        callback: HotkeyCallback,
    ) -> DeviceResult<SubscriptionHandle> {
        self.ensure_hook_thread()?;
        let handle = self.handle();
        self.state
            .lock()
            .hotkeys
            .insert(handle.0, (hotkey.clone(), callback));
        Ok(handle)
    }
}

fn button_from_rdev(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(_) => None,
    }
}

fn button_to_rdev(button: MouseButton) -> DeviceResult<Button> {
    match button {
        MouseButton::Left => Ok(Button::Left),
        MouseButton::Right => Ok(Button::Right),
        MouseButton::Middle => Ok(Button::Middle),
        MouseButton::Unknown(name) => Err(DeviceError::UnknownButton(name)),
    }
}

const NAMED: &[(NamedKey, Key)] = &[
    (NamedKey::Alt, Key::Alt),
    (NamedKey::AltGr, Key::AltGr),
    (NamedKey::Backspace, Key::Backspace),
    (NamedKey::CapsLock, Key::CapsLock),
    (NamedKey::CmdL, Key::MetaLeft),
    (NamedKey::CmdR, Key::MetaRight),
    (NamedKey::CtrlL, Key::ControlLeft),
    (NamedKey::CtrlR, Key::ControlRight),
    (NamedKey::Delete, Key::Delete),
    (NamedKey::Down, Key::DownArrow),
    (NamedKey::End, Key::End),
    (NamedKey::Enter, Key::Return),
    (NamedKey::Esc, Key::Escape),
    (NamedKey::F1, Key::F1),
    (NamedKey::F2, Key::F2),
    (NamedKey::F3, Key::F3),
    (NamedKey::F4, Key::F4),
    (NamedKey::F5, Key::F5),
    (NamedKey::F6, Key::F6),
    (NamedKey::F7, Key::F7),
    (NamedKey::F8, Key::F8),
    (NamedKey::F9, Key::F9),
    (NamedKey::F10, Key::F10),
    (NamedKey::F11, Key::F11),
    (NamedKey::F12, Key::F12),
    (NamedKey::Home, Key::Home),
    (NamedKey::Insert, Key::Insert),
    (NamedKey::Left, Key::LeftArrow),
    (NamedKey::NumLock, Key::NumLock),
    (NamedKey::PageDown, Key::PageDown),
    (NamedKey::PageUp, Key::PageUp),
    (NamedKey::Pause, Key::Pause),
    (NamedKey::PrintScreen, Key::PrintScreen),
    (NamedKey::Right, Key::RightArrow),
    (NamedKey::ScrollLock, Key::ScrollLock),
    (NamedKey::ShiftL, Key::ShiftLeft),
    (NamedKey::ShiftR, Key::ShiftRight),
    (NamedKey::Space, Key::Space),
    (NamedKey::Tab, Key::Tab),
    (NamedKey::Up, Key::UpArrow),
    (NamedKey::Enter, Key::KpReturn),
    (NamedKey::Delete, Key::KpDelete),
];

const CHARS: &[(char, Key)] = &[
    ('a', Key::KeyA),
    ('b', Key::KeyB),
    ('c', Key::KeyC),
    ('d', Key::KeyD),
    ('e', Key::KeyE),
    ('f', Key::KeyF),
    ('g', Key::KeyG),
    ('h', Key::KeyH),
    ('i', Key::KeyI),
    ('j', Key::KeyJ),
    ('k', Key::KeyK),
    ('l', Key::KeyL),
    ('m', Key::KeyM),
    ('n', Key::KeyN),
    ('o', Key::KeyO),
    ('p', Key::KeyP),
    ('q', Key::KeyQ),
    ('r', Key::KeyR),
    ('s', Key::KeyS),
    ('t', Key::KeyT),
    ('u', Key::KeyU),
    ('v', Key::KeyV),
    ('w', Key::KeyW),
    ('x', Key::KeyX),
    ('y', Key::KeyY),
    ('z', Key::KeyZ),
    ('0', Key::Num0),
    ('1', Key::Num1),
    ('2', Key::Num2),
    ('3', Key::Num3),
    ('4', Key::Num4),
    ('5', Key::Num5),
    ('6', Key::Num6),
    ('7', Key::Num7),
    ('8', Key::Num8),
    ('9', Key::Num9),
    ('`', Key::BackQuote),
    ('-', Key::Minus),
    ('=', Key::Equal),
    ('[', Key::LeftBracket),
    (']', Key::RightBracket),
    (';', Key::SemiColon),
    ('\'', Key::Quote),
    ('\\', Key::BackSlash),
    (',', Key::Comma),
    ('.', Key::Dot),
    ('/', Key::Slash),
    ('+', Key::KpPlus),
    ('*', Key::KpMultiply),
    ('0', Key::Kp0),
    ('1', Key::Kp1),
    ('2', Key::Kp2),
    ('3', Key::Kp3),
    ('4', Key::Kp4),
    ('5', Key::Kp5),
    ('6', Key::Kp6),
    ('7', Key::Kp7),
    ('8', Key::Kp8),
    ('9', Key::Kp9),
    ('-', Key::KpMinus),
    ('/', Key::KpDivide),
];

/// Keys with no stable identifier (e.g. `Fn`) are not recorded.
fn symbol_from_key(key: Key) -> Option<KeySymbol> {
    if let Key::Unknown(code) = key {
        return Some(KeySymbol::Code(code));
    }
    if let Some((named, _)) = NAMED.iter().find(|(_, k)| *k == key) {
        return Some(KeySymbol::Named(*named));
    }
    CHARS
        .iter()
        .find(|(_, k)| *k == key)
        .map(|(c, _)| KeySymbol::Char(*c))
}

fn key_from_symbol(symbol: KeySymbol) -> DeviceResult<Key> {
    let unknown = || DeviceError::UnknownKey(symbol.to_string());
    match symbol {
        KeySymbol::Code(code) => Ok(Key::Unknown(code)),
        KeySymbol::Char(' ') => Ok(Key::Space),
        KeySymbol::Char(c) => {
            let c = c.to_lowercase().next().ok_or_else(unknown)?;
            CHARS
                .iter()
                .find(|(ch, _)| *ch == c)
                .map(|(_, key)| *key)
                .ok_or_else(unknown)
        }
        KeySymbol::Named(named) => {
            let named = match named {
                NamedKey::AltL => NamedKey::Alt,
                NamedKey::AltR => NamedKey::AltGr,
                NamedKey::Cmd => NamedKey::CmdL,
                NamedKey::Ctrl => NamedKey::CtrlL,
                NamedKey::Shift => NamedKey::ShiftL,
                other => other,
            };
            NAMED
                .iter()
                .find(|(n, _)| *n == named)
                .map(|(_, key)| *key)
                .ok_or_else(unknown)
        }
    }
}
