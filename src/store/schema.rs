//! On-disk macro format

use crate::capture::input::types::{EventKind, RecordedEvent};
use chrono::NaiveDateTime;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

/// A named, saved event sequence. One JSON file per macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "created")]
    pub created_at: NaiveDateTime,
    pub events: Vec<RecordedEvent>,
}

impl Sequence {
    pub fn stats(&self) -> SequenceStats {
        SequenceStats::from_events(&self.events)
    }
}

/// Listing entry for a saved macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub name: String,
    pub description: String,
    pub created: Option<NaiveDateTime>,
    pub events_count: usize,
}

/// Lenient view of a macro file used for listing: only the shape of the
/// header matters, events are counted but not decoded.
#[derive(Debug, Deserialize)]
pub(crate) struct SequenceHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub events: Vec<IgnoredAny>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Click, key and duration counts used in auto-save descriptions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceStats {
    pub clicks: usize,
    pub key_presses: usize,
    pub duration_secs: f64,
}

impl SequenceStats {
    pub fn from_events(events: &[RecordedEvent]) -> Self {
        let clicks = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::MouseClick { pressed: true, .. }))
            .count();
        let key_presses = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::KeyPress { .. }))
            .count();
        let duration_secs = match (events.first(), events.last()) {
            (Some(first), Some(last)) if events.len() > 1 => last.offset - first.offset,
            _ => 0.0,
        };

        Self {
            clicks,
            key_presses,
            duration_secs,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "Auto-saved macro: {} clicks, {} key presses, {:.1}s duration",
            self.clicks, self.key_presses, self.duration_secs
        )
    }
}
