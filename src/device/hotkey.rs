use super::DeviceError;
use crate::capture::input::keys::{KeySymbol, Modifier};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A key combination such as `<ctrl>+s` or `<esc>`.
///
/// Tokens are joined with `+`. Bracketed tokens name modifiers or keys,
/// bare single characters are literal keys. The last token is the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    modifiers: BTreeSet<Modifier>,
    key: KeySymbol,
}

impl Hotkey {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: KeySymbol) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key,
        }
    }

    pub fn key(&self) -> KeySymbol {
        self.key
    }

    pub fn modifiers(&self) -> &BTreeSet<Modifier> {
        &self.modifiers
    }

    /// True when `key` is the trigger and every required modifier is held.
    pub fn is_triggered_by(&self, key: &KeySymbol, held: &BTreeSet<Modifier>) -> bool {
        self.key.matches(key) && self.modifiers.is_subset(held)
    }
}

impl FromStr for Hotkey {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DeviceError::InvalidHotkey(s.to_string());
        let tokens: Vec<&str> = s.split('+').map(str::trim).collect();
        let (trigger, modifier_tokens) = tokens.split_last().ok_or_else(invalid)?;

        let mut modifiers = BTreeSet::new();
        for token in modifier_tokens {
            let name = token
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .ok_or_else(invalid)?;
            modifiers.insert(name.to_ascii_lowercase().parse::<Modifier>().map_err(|_| invalid())?);
        }

        let key = match trigger.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            Some(name) => KeySymbol::parse(&name.to_ascii_lowercase()).map_err(|_| invalid())?,
            None if trigger.chars().count() == 1 => KeySymbol::parse(trigger).map_err(|_| invalid())?,
            None => return Err(invalid()),
        };

        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            let name = match modifier {
                Modifier::Ctrl => "ctrl",
                Modifier::Shift => "shift",
                Modifier::Alt => "alt",
                Modifier::Cmd => "cmd",
            };
            write!(f, "<{}>+", name)?;
        }
        match self.key {
            KeySymbol::Char(c) => write!(f, "{}", c),
            other => write!(f, "<{}>", other),
        }
    }
}
