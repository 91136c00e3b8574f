//! Keyed snapshot records with change detection.
//!
//! Generalizes the small per-user/per-entity state entries that background
//! monitors rely on: a snapshot of keyed records is persisted, the next
//! poll produces a fresh snapshot, and `diff` reports what appeared,
//! disappeared, or changed in between. Records are created by a triggering
//! action, mutated by later ones, and explicitly cleared on completion.

use ferrochat_core::error::StoreError;
use ferrochat_core::store::KeyValueStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Changes between two snapshots, keyed by record id.
#[derive(Debug, Default, PartialEq)]
pub struct SnapshotChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Records present in both whose value differs
    pub changed: Vec<String>,
}

impl SnapshotChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// A persisted map of record-id → JSON record under one snapshot key.
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Load the last saved snapshot; empty if none exists.
    pub async fn load(&self) -> Result<HashMap<String, Value>, StoreError> {
        match self.store.get(&self.key).await? {
            Some(Value::Object(map)) => Ok(map.into_iter().collect()),
            Some(_) | None => Ok(HashMap::new()),
        }
    }

    /// Replace the stored snapshot wholesale.
    pub async fn save(&self, records: &HashMap<String, Value>) -> Result<(), StoreError> {
        let map: serde_json::Map<String, Value> =
            records.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.store.set(&self.key, Value::Object(map)).await?;
        debug!(key = %self.key, records = records.len(), "Snapshot saved");
        Ok(())
    }

    /// Drop the stored snapshot.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(&self.key).await?;
        Ok(())
    }

    /// Compare two snapshots. Output ids are sorted for determinism.
    pub fn diff(old: &HashMap<String, Value>, new: &HashMap<String, Value>) -> SnapshotChanges {
        let mut changes = SnapshotChanges::default();

        for (id, record) in new {
            match old.get(id) {
                None => changes.added.push(id.clone()),
                Some(previous) if previous != record => changes.changed.push(id.clone()),
                Some(_) => {}
            }
        }
        for id in old.keys() {
            if !new.contains_key(id) {
                changes.removed.push(id.clone());
            }
        }

        changes.added.sort();
        changes.removed.sort();
        changes.changed.sort();
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryStore;
    use serde_json::json;

    fn records(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let snapshots = SnapshotStore::new(Arc::new(InMemoryStore::new()), "tasks");
        let current = records(&[
            ("t1", json!({"title": "Fix timer", "state": "open"})),
            ("t2", json!({"title": "Ship beta", "state": "done"})),
        ]);
        snapshots.save(&current).await.unwrap();

        let loaded = snapshots.load().await.unwrap();
        assert_eq!(loaded, current);
    }

    #[tokio::test]
    async fn load_without_snapshot_is_empty() {
        let snapshots = SnapshotStore::new(Arc::new(InMemoryStore::new()), "tasks");
        assert!(snapshots.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_removes_snapshot() {
        let snapshots = SnapshotStore::new(Arc::new(InMemoryStore::new()), "tasks");
        snapshots.save(&records(&[("t1", json!(1))])).await.unwrap();
        snapshots.clear().await.unwrap();
        assert!(snapshots.load().await.unwrap().is_empty());
    }

    #[test]
    fn diff_detects_all_change_kinds() {
        let old = records(&[
            ("t1", json!({"state": "open"})),
            ("t2", json!({"state": "open"})),
            ("t3", json!({"state": "open"})),
        ]);
        let new = records(&[
            ("t1", json!({"state": "open"})),   // unchanged
            ("t2", json!({"state": "done"})),   // changed
            ("t4", json!({"state": "open"})),   // added
        ]);

        let changes = SnapshotStore::diff(&old, &new);
        assert_eq!(changes.added, vec!["t4"]);
        assert_eq!(changes.removed, vec!["t3"]);
        assert_eq!(changes.changed, vec!["t2"]);
        assert!(!changes.is_empty());
    }

    #[test]
    fn diff_of_identical_snapshots_is_empty() {
        let snapshot = records(&[("t1", json!({"state": "open"}))]);
        assert!(SnapshotStore::diff(&snapshot, &snapshot).is_empty());
    }
}
