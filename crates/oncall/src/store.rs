//! Schedule persistence.
//!
//! A store only round-trips the whole ordered list. Callers serialize their
//! own load-modify-save cycles.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{EscalationError, EscalationResult};
use crate::schedule::ScheduleEntry;

/// Storage backend for the ordered schedule.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Load every entry in stored order. A store that does not exist yet is empty.
    async fn load(&self) -> EscalationResult<Vec<ScheduleEntry>>;

    /// Replace the stored schedule with `entries`.
    async fn save(&self, entries: &[ScheduleEntry]) -> EscalationResult<()>;
}

/// JSON file store, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct FileScheduleStore {
    path: PathBuf,
}

impl FileScheduleStore {
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the schedule file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> EscalationError {
        EscalationError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ScheduleStore for FileScheduleStore {
    async fn load(&self) -> EscalationResult<Vec<ScheduleEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Schedule file does not exist, returning empty schedule");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<ScheduleEntry> =
            serde_json::from_str(&content).map_err(|source| EscalationError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), entries = entries.len(), "Schedule loaded");
        Ok(entries)
    }

    async fn save(&self, entries: &[ScheduleEntry]) -> EscalationResult<()> {
        let json = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Schedule saved");
        Ok(())
    }
}

/// In-process store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    entries: RwLock<Vec<ScheduleEntry>>,
}

impl MemoryScheduleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn load(&self) -> EscalationResult<Vec<ScheduleEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, entries: &[ScheduleEntry]) -> EscalationResult<()> {
        *self.entries.write().await = entries.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(start: &str, end: &str, number: &str) -> ScheduleEntry {
        ScheduleEntry::parse(start, end, number).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileScheduleStore::new(temp_dir.path().join("schedule.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schedule.json");
        std::fs::write(&path, "").unwrap();

        let store = FileScheduleStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_load_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileScheduleStore::new(temp_dir.path().join("config/schedule.json"));

        let entries = vec![
            entry("09:00", "17:00", "+1"),
            entry("17:00", "23:00", "+2"),
            entry("08:00", "10:00", "+3"),
        ];
        store.save(&entries).await.unwrap();

        assert_eq!(store.load().await.unwrap(), entries);
    }

    #[tokio::test]
    async fn test_file_is_indented_json_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schedule.json");
        let store = FileScheduleStore::new(&path);

        store.save(&[entry("09:00", "17:00", "+1")]).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("[\n  {"));
        assert!(raw.contains("\"start_time\": \"09:00\""));
        assert!(raw.contains("\"phone_number\": \"+1\""));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schedule.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileScheduleStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, EscalationError::Malformed { .. }));
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_unreadable_path_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be read as a file.
        let err = FileScheduleStore::new(temp_dir.path()).load().await.unwrap_err();
        assert!(matches!(err, EscalationError::Io { .. }));
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryScheduleStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let entries = vec![entry("01:00", "02:00", "+9")];
        store.save(&entries).await.unwrap();
        assert_eq!(store.load().await.unwrap(), entries);
    }
}
