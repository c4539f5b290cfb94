//! Request and response payloads for the macro commands

use crate::capture::input::types::RecordedEvent;
use crate::store::SequenceSummary;
use serde::{Deserialize, Serialize};

fn default_speed() -> f64 {
    1.0
}

fn default_repeat() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn from_flag(success: bool, refusal: &str) -> Self {
        Self {
            success,
            error: (!success).then(|| refusal.to_string()),
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopCaptureResponse {
    pub success: bool,
    pub events: Vec<RecordedEvent>,
    pub auto_saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCountResponse {
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMacroRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub events: Vec<RecordedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMacroResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayMacroRequest {
    #[serde(default)]
    pub events: Vec<RecordedEvent>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaySavedMacroRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayLoopRequest {
    #[serde(default)]
    pub events: Vec<RecordedEvent>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Seconds between passes; the configured default when absent
    #[serde(default)]
    pub delay: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMacroRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMacrosResponse {
    pub macros: Vec<SequenceSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub recording: bool,
    pub playing: bool,
    pub looping: bool,
    pub event_count: usize,
}
