//! Durable transcript storage.
//!
//! The whole transcript lives under one fixed key and is rewritten after
//! every append. There is no versioning or merging: if two clients share
//! the same file, the last writer wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::state::ChatMessage;

/// Fixed identifier the transcript is stored under.
pub const HISTORY_KEY: &str = "clinical_chat_history";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a session mirrors its transcript.
pub trait TranscriptStore: Send {
    /// Previously stored turns, or `None` if nothing is stored.
    fn load(&self) -> Result<Option<Vec<ChatMessage>>, StorageError>;

    /// Replace the stored value with `turns`.
    fn save(&self, turns: &[ChatMessage]) -> Result<(), StorageError>;

    /// Erase the stored value. Removing an absent value is not an error.
    fn remove(&self) -> Result<(), StorageError>;
}

/// Transcript stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the platform data directory.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(data_dir
            .join("clinical-copilot")
            .join(format!("{}.json", HISTORY_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl TranscriptStore for FileStore {
    fn load(&self) -> Result<Option<Vec<ChatMessage>>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let turns: Vec<ChatMessage> = serde_json::from_str(&contents)?;
        Ok(Some(turns))
    }

    fn save(&self, turns: &[ChatMessage]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash never leaves a half-written transcript
        let temp_path = self.temp_path();
        let json = serde_json::to_string_pretty(turns)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory store. Clones share the same slot, so a second session built
/// from a clone sees what the first one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a raw value, as if some earlier run had written it.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// The raw serialized value currently stored.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TranscriptStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<ChatMessage>>, StorageError> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, turns: &[ChatMessage]) -> Result<(), StorageError> {
        let json = serde_json::to_string(turns)?;
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<ChatMessage> {
        vec![
            ChatMessage::welcome(),
            ChatMessage::user("2yo fever and cough"),
            ChatMessage::assistant("Assessment: pneumonia"),
        ]
    }

    #[test]
    fn test_file_store_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("history.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("history.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!dir.path().join("nested").join("history.json.tmp").exists());
    }

    #[test]
    fn test_file_store_save_replaces_previous_value() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("history.json"));

        store.save(&sample()).unwrap();
        store.save(&[ChatMessage::welcome()]).unwrap();
        assert_eq!(store.load().unwrap(), Some(vec![ChatMessage::welcome()]));
    }

    #[test]
    fn test_file_store_corrupt_json_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.load(), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_file_store_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("history.json"));

        store.save(&sample()).unwrap();
        store.remove().unwrap();
        store.remove().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.save(&sample()).unwrap();
        assert_eq!(other.load().unwrap(), Some(sample()));

        other.remove().unwrap();
        assert!(store.raw().is_none());
    }

    #[test]
    fn test_memory_store_uses_role_content_records() {
        let store = MemoryStore::new();
        store.save(&[ChatMessage::user("hello")]).unwrap();
        assert_eq!(
            store.raw().unwrap(),
            r#"[{"role":"user","content":"hello"}]"#
        );
    }
}
