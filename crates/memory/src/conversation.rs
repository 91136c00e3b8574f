//! Per-user conversation history with a hard length bound.
//!
//! History is what gets prepended to future model requests. The system
//! prompt is never stored here — it is synthesized fresh per turn — and a
//! RAG-augmented query is never stored either; callers append the original
//! user text.

use ferrochat_core::message::{Message, Role, UserId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Bounded per-user message history. Oldest messages are evicted first
/// once the bound is exceeded.
pub struct ConversationStore {
    histories: RwLock<HashMap<UserId, Vec<Message>>>,
    max_len: usize,
}

impl ConversationStore {
    pub fn new(max_len: usize) -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
            max_len,
        }
    }

    /// Append a message to the user's history, evicting from the front
    /// until the bound holds. System messages are not stored.
    pub async fn append(&self, user: &UserId, message: Message) {
        if message.role == Role::System {
            debug!(user = %user, "Ignoring system message append");
            return;
        }

        let mut histories = self.histories.write().await;
        let history = histories.entry(user.clone()).or_default();
        history.push(message);

        if history.len() > self.max_len {
            let excess = history.len() - self.max_len;
            history.drain(..excess);
            debug!(user = %user, evicted = excess, "Trimmed conversation history");
        }
    }

    /// A snapshot of the user's history, oldest first. Callers own the copy.
    pub async fn history(&self, user: &UserId) -> Vec<Message> {
        self.histories
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    /// Current message count for the user.
    pub async fn len(&self, user: &UserId) -> usize {
        self.histories
            .read()
            .await
            .get(user)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Empty the user's history.
    pub async fn clear(&self, user: &UserId) {
        if let Some(history) = self.histories.write().await.get_mut(user) {
            history.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[tokio::test]
    async fn append_and_snapshot() {
        let store = ConversationStore::new(50);
        let u = user("alice");
        store.append(&u, Message::user("hello")).await;
        store.append(&u, Message::assistant("hi there")).await;

        let history = store.history(&u).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "hi there");
    }

    #[tokio::test]
    async fn overflow_evicts_oldest_first() {
        let max = 5;
        let store = ConversationStore::new(max);
        let u = user("alice");

        for i in 0..12 {
            store.append(&u, Message::user(format!("msg {i}"))).await;
        }

        let history = store.history(&u).await;
        assert_eq!(history.len(), max);
        // Exactly the most recent `max`, in original order
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 7", "msg 8", "msg 9", "msg 10", "msg 11"]);
    }

    #[tokio::test]
    async fn system_messages_are_never_stored() {
        let store = ConversationStore::new(10);
        let u = user("alice");
        store.append(&u, Message::system("You are a consultant")).await;
        store.append(&u, Message::user("hello")).await;

        let history = store.history(&u).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn clear_empties_history() {
        let store = ConversationStore::new(10);
        let u = user("alice");
        store.append(&u, Message::user("hello")).await;
        store.clear(&u).await;
        assert_eq!(store.len(&u).await, 0);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = ConversationStore::new(10);
        store.append(&user("alice"), Message::user("from alice")).await;
        store.append(&user("bob"), Message::user("from bob")).await;

        let alice = store.history(&user("alice")).await;
        let bob = store.history(&user("bob")).await;
        assert_eq!(alice.len(), 1);
        assert_eq!(bob.len(), 1);
        assert_eq!(alice[0].content, "from alice");
        assert_eq!(bob[0].content, "from bob");
    }

    #[tokio::test]
    async fn snapshot_is_a_copy() {
        let store = ConversationStore::new(10);
        let u = user("alice");
        store.append(&u, Message::user("original")).await;

        let mut snapshot = store.history(&u).await;
        snapshot[0].content = "mutated".into();

        assert_eq!(store.history(&u).await[0].content, "original");
    }
}
