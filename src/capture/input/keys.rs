//! Key identifiers
//!
//! Recorded key events store a plain string. A string of exactly one
//! character is that literal character; anything longer names a key
//! (`esc`, `ctrl_l`, `f5`) or an unmapped scan code (`code_65`). Files written
//! by older versions prefix names with `Key.`, which is accepted on read.

use crate::device::DeviceError;
use std::fmt;
use std::str::FromStr;

/// A resolved key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySymbol {
    Char(char),
    Named(NamedKey),
    Code(u32),
}

impl KeySymbol {
    pub const ESCAPE: KeySymbol = KeySymbol::Named(NamedKey::Esc);

    /// Resolve a stored key string.
    pub fn parse(raw: &str) -> Result<Self, DeviceError> {
        let mut chars = raw.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(KeySymbol::Char(c));
        }

        let name = raw.strip_prefix("Key.").unwrap_or(raw);
        if let Some(code) = name.strip_prefix("code_") {
            return code
                .parse()
                .map(KeySymbol::Code)
                .map_err(|_| DeviceError::UnknownKey(raw.to_string()));
        }

        name.parse()
            .map(KeySymbol::Named)
            .map_err(|_| DeviceError::UnknownKey(raw.to_string()))
    }

    /// Modifier class of this key, if it is a modifier.
    pub fn modifier(&self) -> Option<Modifier> {
        match self {
            KeySymbol::Named(named) => named.modifier(),
            _ => None,
        }
    }

    /// Case-insensitive equality for characters, exact for everything else.
    pub fn matches(&self, other: &KeySymbol) -> bool {
        match (self, other) {
            (KeySymbol::Char(a), KeySymbol::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            _ => self == other,
        }
    }
}

impl fmt::Display for KeySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySymbol::Char(c) => write!(f, "{}", c),
            KeySymbol::Named(named) => f.write_str(named.as_str()),
            KeySymbol::Code(code) => write!(f, "code_{}", code),
        }
    }
}

/// Modifier classes used by hotkey combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Cmd,
}

impl FromStr for Modifier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ctrl" | "control" => Ok(Modifier::Ctrl),
            "shift" => Ok(Modifier::Shift),
            "alt" | "option" => Ok(Modifier::Alt),
            "cmd" | "meta" | "super" => Ok(Modifier::Cmd),
            _ => Err(()),
        }
    }
}

macro_rules! named_keys {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Non-character keys.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NamedKey {
            $($variant),*
        }

        impl NamedKey {
            pub const ALL: &'static [NamedKey] = &[$(NamedKey::$variant),*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(NamedKey::$variant => $name),*
                }
            }
        }

        impl FromStr for NamedKey {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(NamedKey::$variant),)*
                    _ => Err(()),
                }
            }
        }
    };
}

named_keys! {
    Alt => "alt",
    AltL => "alt_l",
    AltR => "alt_r",
    AltGr => "alt_gr",
    Backspace => "backspace",
    CapsLock => "caps_lock",
    Cmd => "cmd",
    CmdL => "cmd_l",
    CmdR => "cmd_r",
    Ctrl => "ctrl",
    CtrlL => "ctrl_l",
    CtrlR => "ctrl_r",
    Delete => "delete",
    Down => "down",
    End => "end",
    Enter => "enter",
    Esc => "esc",
    F1 => "f1",
    F2 => "f2",
    F3 => "f3",
    F4 => "f4",
    F5 => "f5",
    F6 => "f6",
    F7 => "f7",
    F8 => "f8",
    F9 => "f9",
    F10 => "f10",
    F11 => "f11",
    F12 => "f12",
    Home => "home",
    Insert => "insert",
    Left => "left",
    NumLock => "num_lock",
    PageDown => "page_down",
    PageUp => "page_up",
    Pause => "pause",
    PrintScreen => "print_screen",
    Right => "right",
    ScrollLock => "scroll_lock",
    Shift => "shift",
    ShiftL => "shift_l",
    ShiftR => "shift_r",
    Space => "space",
    Tab => "tab",
    Up => "up",
}

impl NamedKey {
    pub fn modifier(&self) -> Option<Modifier> {
        match self {
            NamedKey::Ctrl | NamedKey::CtrlL | NamedKey::CtrlR => Some(Modifier::Ctrl),
            NamedKey::Shift | NamedKey::ShiftL | NamedKey::ShiftR => Some(Modifier::Shift),
            NamedKey::Alt | NamedKey::AltL | NamedKey::AltR | NamedKey::AltGr => Some(Modifier::Alt),
            NamedKey::Cmd | NamedKey::CmdL | NamedKey::CmdR => Some(Modifier::Cmd),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_char_is_literal() {
        assert_eq!(KeySymbol::parse("a").unwrap(), KeySymbol::Char('a'));
        assert_eq!(KeySymbol::parse("A").unwrap(), KeySymbol::Char('A'));
        assert_eq!(KeySymbol::parse("é").unwrap(), KeySymbol::Char('é'));
    }

    #[test]
    fn test_named_keys_with_and_without_prefix() {
        assert_eq!(KeySymbol::parse("esc").unwrap(), KeySymbol::ESCAPE);
        assert_eq!(KeySymbol::parse("Key.esc").unwrap(), KeySymbol::ESCAPE);
        assert_eq!(
            KeySymbol::parse("Key.ctrl_l").unwrap(),
            KeySymbol::Named(NamedKey::CtrlL)
        );
        assert_eq!(KeySymbol::parse("code_65").unwrap(), KeySymbol::Code(65));
    }

    #[test]
    fn test_unknown_names_fail() {
        assert!(matches!(
            KeySymbol::parse("hyper"),
            Err(DeviceError::UnknownKey(name)) if name == "hyper"
        ));
        assert!(KeySymbol::parse("code_x").is_err());
        assert!(KeySymbol::parse("").is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for named in NamedKey::ALL {
            let symbol = KeySymbol::Named(*named);
            let text = symbol.to_string();
            assert!(text.chars().count() > 1, "{} must not look like a char", text);
            assert_eq!(KeySymbol::parse(&text).unwrap(), symbol);
        }
        assert_eq!(KeySymbol::Code(12).to_string(), "code_12");
    }

    #[test]
    fn test_modifiers() {
        assert_eq!(KeySymbol::Named(NamedKey::CtrlR).modifier(), Some(Modifier::Ctrl));
        assert_eq!(KeySymbol::Named(NamedKey::AltGr).modifier(), Some(Modifier::Alt));
        assert_eq!(KeySymbol::Char('s').modifier(), None);
        assert_eq!("control".parse::<Modifier>(), Ok(Modifier::Ctrl));
    }

    #[test]
    fn test_char_matching_ignores_case() {
        assert!(KeySymbol::Char('S').matches(&KeySymbol::Char('s')));
        assert!(!KeySymbol::Char('s').matches(&KeySymbol::ESCAPE));
    }
}
