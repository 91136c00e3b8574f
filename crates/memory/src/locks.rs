//! Per-user mutual exclusion.
//!
//! Operations that mutate per-user state (history writes, stateful
//! triggers) must be serialized per user key so two concurrent messages
//! from the same user cannot interleave. Different users proceed fully in
//! parallel.

use ferrochat_core::message::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lazily-populated map of per-user async mutexes.
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock for one user. The guard serializes all same-user
    /// work for as long as it is held.
    pub async fn acquire(&self, user: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(user.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

impl Default for UserLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new());
        let in_critical = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_critical = Arc::clone(&in_critical);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let user = UserId::new("alice");
                let _guard = locks.acquire(&user).await;
                let now = in_critical.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_critical.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_users_run_in_parallel() {
        let locks = Arc::new(UserLocks::new());

        let alice = locks.acquire(&UserId::new("alice")).await;

        // Bob's lock must be acquirable while Alice's is held.
        let bob = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&UserId::new("bob")),
        )
        .await;
        assert!(bob.is_ok());
        drop(alice);
    }
}
