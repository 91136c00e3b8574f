//! Per-user state for Ferrochat: conversation history, persisted flags,
//! keyed snapshots, and the lock discipline that serializes same-user
//! mutations.

pub mod conversation;
pub mod flags;
pub mod kv;
pub mod locks;
pub mod snapshot;

pub use conversation::ConversationStore;
pub use flags::FlagStore;
pub use kv::{InMemoryStore, JsonFileStore};
pub use locks::UserLocks;
pub use snapshot::{SnapshotChanges, SnapshotStore};
