//! KeyValueStore trait — the pluggable persistence seam.
//!
//! Flag stores, conversation snapshots, and task snapshots all persist
//! through this interface, so the same logic works against a JSON file, an
//! embedded KV store, or a managed database without touching calling code.

use crate::error::StoreError;
use async_trait::async_trait;

/// A keyed JSON-value store. One instance per logical store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value for a key, `None` if absent.
    async fn get(&self, key: &str) -> std::result::Result<Option<serde_json::Value>, StoreError>;

    /// Insert or replace the value for a key.
    async fn set(&self, key: &str, value: serde_json::Value)
    -> std::result::Result<(), StoreError>;

    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> std::result::Result<bool, StoreError>;

    /// All stored keys, unordered.
    async fn keys(&self) -> std::result::Result<Vec<String>, StoreError>;
}
