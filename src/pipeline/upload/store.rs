//! Durable persistence for the active upload task set.
//!
//! The contract is deliberately small: write the whole set, read the whole
//! set. The set only ever holds non-terminal tasks (a handful at most), so a
//! single JSON file with an atomic replace is the right tool — no partial
//! updates, no query access.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use super::error::UploadError;
use super::types::UploadTask;

/// Whole-set persistence for upload tasks.
pub trait TaskStore: Send + Sync {
    /// Replace the persisted set with `tasks`. Must be durable on return.
    fn save(&self, tasks: &[UploadTask]) -> Result<(), UploadError>;

    /// Read the persisted set. An absent store reads as empty.
    fn load(&self) -> Result<Vec<UploadTask>, UploadError>;
}

/// JSON-file-backed store with atomic replace (write to a temp file in the
/// same directory, then rename over the target).
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default location under the app data directory.
    pub fn at_default_location() -> Self {
        Self::new(crate::config::task_set_path())
    }
}

impl TaskStore for JsonFileStore {
    fn save(&self, tasks: &[UploadTask]) -> Result<(), UploadError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| UploadError::Persistence("store path has no parent".to_string()))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| UploadError::Persistence(e.to_string()))?;

        // Compact output: the set carries document bytes, and pretty-printing
        // multiplies the write while the queue lock is held.
        let json = serde_json::to_vec(tasks)
            .map_err(|e| UploadError::Persistence(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| UploadError::Persistence(e.to_string()))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.flush())
            .map_err(|e| UploadError::Persistence(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| UploadError::Persistence(e.to_string()))?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<UploadTask>, UploadError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(UploadError::Persistence(e.to_string())),
        };
        serde_json::from_slice(&bytes).map_err(|e| UploadError::Persistence(e.to_string()))
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Vec<UploadTask>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for MemoryStore {
    fn save(&self, tasks: &[UploadTask]) -> Result<(), UploadError> {
        *self.inner.lock().unwrap() = tasks.to_vec();
        Ok(())
    }

    fn load(&self) -> Result<Vec<UploadTask>, UploadError> {
        Ok(self.inner.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::upload::types::{Document, Priority};

    fn sample_task() -> UploadTask {
        UploadTask::new(
            Document::new("report.pdf", "application/pdf", vec![1, 2, 3]),
            Priority::Normal,
        )
    }

    #[test]
    fn file_store_round_trips_task_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tasks.json"));

        let tasks = vec![sample_task(), sample_task()];
        store.save(&tasks).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, tasks[0].id);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("never_written.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_replaces_previous_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tasks.json"));

        store.save(&[sample_task(), sample_task()]).unwrap();
        let survivor = sample_task();
        store.save(std::slice::from_ref(&survivor)).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, survivor.id);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/deeper/tasks.json"));
        store.save(&[sample_task()]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, b"{ not valid json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(
            store.load().unwrap_err(),
            UploadError::Persistence(_)
        ));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        store.save(&[sample_task()]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
        store.save(&[]).unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
