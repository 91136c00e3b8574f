//! Per-user boolean flags with persistence.
//!
//! Backs the RAG toggle: the flag's state survives restarts and is
//! independent of conversation history. Default for an unknown user is
//! `false`.

use ferrochat_core::error::StoreError;
use ferrochat_core::message::UserId;
use ferrochat_core::store::KeyValueStore;
use std::sync::Arc;
use tracing::info;

pub struct FlagStore {
    name: &'static str,
    store: Arc<dyn KeyValueStore>,
}

impl FlagStore {
    /// `name` labels the flag in logs (e.g. "rag").
    pub fn new(name: &'static str, store: Arc<dyn KeyValueStore>) -> Self {
        Self { name, store }
    }

    /// Whether the flag is enabled for a user (default: false).
    pub async fn is_enabled(&self, user: &UserId) -> bool {
        match self.store.get(&user.0).await {
            Ok(Some(value)) => value.as_bool().unwrap_or(false),
            _ => false,
        }
    }

    /// Set the flag, persisting immediately.
    pub async fn set_enabled(&self, user: &UserId, enabled: bool) -> Result<(), StoreError> {
        self.store
            .set(&user.0, serde_json::Value::Bool(enabled))
            .await?;
        info!(flag = self.name, user = %user, enabled, "Flag updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{InMemoryStore, JsonFileStore};
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn defaults_to_disabled() {
        let flags = FlagStore::new("rag", Arc::new(InMemoryStore::new()));
        assert!(!flags.is_enabled(&UserId::new("alice")).await);
    }

    #[tokio::test]
    async fn toggle_round_trip() {
        let flags = FlagStore::new("rag", Arc::new(InMemoryStore::new()));
        let u = UserId::new("alice");

        flags.set_enabled(&u, true).await.unwrap();
        assert!(flags.is_enabled(&u).await);

        flags.set_enabled(&u, false).await.unwrap();
        assert!(!flags.is_enabled(&u).await);
    }

    #[tokio::test]
    async fn state_survives_reload() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let flags = FlagStore::new("rag", Arc::new(JsonFileStore::new(path.clone())));
        flags.set_enabled(&UserId::new("alice"), true).await.unwrap();

        let reloaded = FlagStore::new("rag", Arc::new(JsonFileStore::new(path)));
        assert!(reloaded.is_enabled(&UserId::new("alice")).await);
        assert!(!reloaded.is_enabled(&UserId::new("bob")).await);
    }
}
