use super::schema::{Sequence, SequenceHeader, SequenceStats, SequenceSummary};
use crate::capture::input::types::RecordedEvent;
use crate::error::{MacroError, MacroResult};
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory of saved macros, one `<name>.json` file each.
#[derive(Debug, Clone)]
pub struct SequenceStore {
    dir: PathBuf,
}

impl SequenceStore {
    /// Open the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> MacroResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("Macro store at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> MacroResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Write a macro, replacing any existing one with the same name.
    pub fn save(
        &self,
        name: &str,
        events: &[RecordedEvent],
        description: &str,
    ) -> MacroResult<PathBuf> {
        self.save_at(name, events, description, Local::now().naive_local())
    }

    fn save_at(
        &self,
        name: &str,
        events: &[RecordedEvent],
        description: &str,
        created_at: NaiveDateTime,
    ) -> MacroResult<PathBuf> {
        let path = self.path_for(name)?;
        let sequence = Sequence {
            name: name.to_string(),
            description: description.to_string(),
            created_at,
            events: events.to_vec(),
        };

        let data = serde_json::to_vec_pretty(&sequence)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&path).map_err(|e| MacroError::Io(e.error))?;

        tracing::info!("Saved macro {:?} ({} events) to {:?}", name, events.len(), path);
        Ok(path)
    }

    /// Save under a timestamped name with a generated description.
    /// Returns `None` without touching disk when there is nothing to save.
    pub fn autosave(&self, events: &[RecordedEvent]) -> MacroResult<Option<PathBuf>> {
        self.autosave_at(events, Local::now().naive_local())
    }

    fn autosave_at(
        &self,
        events: &[RecordedEvent],
        now: NaiveDateTime,
    ) -> MacroResult<Option<PathBuf>> {
        if events.is_empty() {
            return Ok(None);
        }

        let name = format!("macro_{}", now.format("%Y%m%d_%H%M%S"));
        let description = SequenceStats::from_events(events).describe();
        self.save_at(&name, events, &description, now).map(Some)
    }

    /// Load a macro. `Ok(None)` if it does not exist.
    pub fn load(&self, name: &str) -> MacroResult<Option<Sequence>> {
        let path = self.path_for(name)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Summaries of every readable macro, sorted by name. Unreadable files
    /// are logged and skipped.
    pub fn list(&self) -> MacroResult<Vec<SequenceSummary>> {
        let mut summaries = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!("Error reading macro directory entry: {}", e);
                    continue;
                }
            };
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match read_summary(&path) {
                Ok(summary) => summaries.push(summary),
                Err(e) => tracing::warn!("Error reading macro {:?}: {}", path, e),
            }
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    /// Remove a macro. Returns whether a file was deleted.
    pub fn delete(&self, name: &str) -> MacroResult<bool> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted macro {:?}", name);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_summary(path: &Path) -> MacroResult<SequenceSummary> {
    let content = std::fs::read_to_string(path)?;
    let header: SequenceHeader = serde_json::from_str(&content)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(SequenceSummary {
        name: header.name.unwrap_or(stem),
        description: header.description,
        created: header.created,
        events_count: header.events.len(),
    })
}

/// Names become file names: no separators, no leading dot, not blank.
fn validate_name(name: &str) -> MacroResult<()> {
    let invalid = name.trim().is_empty()
        || name != name.trim()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(MacroError::InvalidName(name.to_string()));
    }
    Ok(())
}
