//! KeyValueStore implementations.
//!
//! `JsonFileStore` keeps one JSON object per logical store on disk (keyed
//! map inside), loaded at construction and flushed on every mutation.
//! `InMemoryStore` backs tests and ephemeral deployments. No schema
//! versioning: a format change requires resetting the store file.

use async_trait::async_trait;
use ferrochat_core::error::StoreError;
use ferrochat_core::store::KeyValueStore;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed store: the whole map serialized as one JSON object.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, Value>>,
}

impl JsonFileStore {
    /// Open (or create-on-first-write) the store at `path`.
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), keys = entries.len(), "JSON store loaded");
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn load_from_disk(path: &PathBuf) -> HashMap<String, Value> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(), // File doesn't exist yet — start empty
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupted store file, starting fresh");
                HashMap::new()
            }
        }
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let entries = self.entries.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("failed to create store dir: {e}")))?;
        }

        let content = serde_json::to_string_pretty(&*entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        std::fs::write(&self.path, content)
            .map_err(|e| StoreError::Storage(format!("failed to write store file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        self.flush().await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            self.flush().await?;
        }
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// A purely in-memory store for tests and ephemeral state.
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn set_and_reload_persists() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = JsonFileStore::new(path.clone());
        store.set("42", json!(true)).await.unwrap();

        let store2 = JsonFileStore::new(path);
        assert_eq!(store2.get("42").await.unwrap(), Some(json!(true)));
    }

    #[tokio::test]
    async fn delete_persists() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = JsonFileStore::new(path.clone());
        store.set("k", json!({"a": 1})).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());

        let store2 = JsonFileStore::new(path);
        assert_eq!(store2.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupted_file_starts_fresh() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "this is not json").unwrap();

        let store = JsonFileStore::new(tmp.path().to_path_buf());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let store = JsonFileStore::new(PathBuf::from("/tmp/ferrochat_test_missing_store.json"));
        let _ = std::fs::remove_file("/tmp/ferrochat_test_missing_store.json");
        assert_eq!(store.get("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_round_trip() {
        let store = InMemoryStore::new();
        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!(2)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));
        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
