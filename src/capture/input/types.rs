use serde::{Deserialize, Serialize};

/// A single recorded input event.
///
/// `offset` is the time in seconds since the capture session started. Within
/// a sequence offsets never decrease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    #[serde(rename = "timestamp")]
    pub offset: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl RecordedEvent {
    pub fn new(offset: f64, kind: EventKind) -> Self {
        Self { offset, kind }
    }

    pub fn is_move(&self) -> bool {
        matches!(self.kind, EventKind::MouseMove { .. })
    }
}

/// Payload of a recorded event, tagged with the `type` field on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    MouseClick {
        x: f64,
        y: f64,
        button: MouseButton,
        pressed: bool,
    },
    MouseMove {
        x: f64,
        y: f64,
    },
    MouseScroll {
        x: f64,
        y: f64,
        dx: i64,
        dy: i64,
    },
    KeyPress {
        #[serde(default, deserialize_with = "nullable_key")]
        key: String,
    },
    KeyRelease {
        #[serde(default, deserialize_with = "nullable_key")]
        key: String,
    },
}

/// Keys without a printable name were written as `null`. They load as an
/// empty key, which replay reports as unknown.
fn nullable_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl EventKind {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::MouseClick { .. } => "mouse_click",
            EventKind::MouseMove { .. } => "mouse_move",
            EventKind::MouseScroll { .. } => "mouse_scroll",
            EventKind::KeyPress { .. } => "key_press",
            EventKind::KeyRelease { .. } => "key_release",
        }
    }
}

/// Mouse button as stored on disk: `"left"`, or the legacy `"Button.left"`.
///
/// Names outside the three standard buttons are kept as `Unknown` so the rest
/// of the sequence still loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Unknown(String),
}

impl From<String> for MouseButton {
    fn from(raw: String) -> Self {
        match raw.strip_prefix("Button.").unwrap_or(&raw) {
            "left" => MouseButton::Left,
            "right" => MouseButton::Right,
            "middle" => MouseButton::Middle,
            _ => MouseButton::Unknown(raw),
        }
    }
}

impl From<MouseButton> for String {
    fn from(button: MouseButton) -> Self {
        button.to_string()
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
            MouseButton::Unknown(name) => write!(f, "{}", name),
        }
    }
}
