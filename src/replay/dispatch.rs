//! Turns recorded events back into synthesized input.

use crate::capture::input::keys::KeySymbol;
use crate::capture::input::types::{EventKind, MouseButton, RecordedEvent};
use crate::device::{DeviceError, DeviceResult, InputDevice};

/// Synthesize one recorded event on `device`.
pub fn execute_event(device: &dyn InputDevice, event: &RecordedEvent) -> DeviceResult<()> {
    match &event.kind {
        EventKind::MouseClick {
            x,
            y,
            button,
            pressed,
        } => {
            if let MouseButton::Unknown(name) = button {
                return Err(DeviceError::UnknownButton(name.clone()));
            }
            device.move_pointer_to(*x, *y)?;
            if *pressed {
                device.press_button(button.clone())
            } else {
                device.release_button(button.clone())
            }
        }
        EventKind::MouseMove { x, y } => device.move_pointer_to(*x, *y),
        EventKind::MouseScroll { x, y, dx, dy } => {
            device.move_pointer_to(*x, *y)?;
            device.scroll(*dx, *dy)
        }
        EventKind::KeyPress { key } => device.press_key(KeySymbol::parse(key)?),
        EventKind::KeyRelease { key } => device.release_key(KeySymbol::parse(key)?),
    }
}
