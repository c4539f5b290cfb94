//! Runtime configuration

use crate::device::{DeviceResult, Hotkey};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for capture, storage and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MacroConfig {
    /// Directory holding one JSON file per saved macro
    pub macros_dir: PathBuf,
    /// Minimum spacing between stored consecutive mouse moves (seconds)
    pub move_throttle_secs: f64,
    /// Combination that stops loop playback
    pub stop_hotkey: String,
    /// Single key that also stops loop playback
    pub escape_key: String,
    /// How long `stop` waits for the playback thread (seconds)
    pub stop_timeout_secs: f64,
    /// Default pause between loop iterations (seconds)
    pub loop_delay_secs: f64,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            macros_dir: PathBuf::from("macros"),
            move_throttle_secs: 0.1,
            stop_hotkey: "<ctrl>+s".to_string(),
            escape_key: "<esc>".to_string(),
            stop_timeout_secs: 5.0,
            loop_delay_secs: 1.0,
        }
    }
}

impl MacroConfig {
    pub fn move_throttle(&self) -> f64 {
        self.move_throttle_secs.max(0.0)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.stop_timeout_secs).unwrap_or(Duration::from_secs(5))
    }

    /// Parse both stop keys.
    pub fn stop_keys(&self) -> DeviceResult<StopKeys> {
        Ok(StopKeys {
            combo: self.stop_hotkey.parse()?,
            escape: self.escape_key.parse()?,
        })
    }
}

/// Keys that cancel loop playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopKeys {
    pub combo: Hotkey,
    pub escape: Hotkey,
}

impl Default for StopKeys {
    fn default() -> Self {
        use crate::capture::input::keys::{KeySymbol, Modifier};
        Self {
            combo: Hotkey::new([Modifier::Ctrl], KeySymbol::Char('s')),
            escape: Hotkey::new([], KeySymbol::ESCAPE),
        }
    }
}
