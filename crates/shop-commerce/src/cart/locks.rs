//! Per-identity mutual exclusion for cart read-modify-write.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async locks.
///
/// Holding the guard for a key serializes all other holders of the same key.
/// Entries nobody holds or waits on are pruned on the next acquisition.
#[derive(Debug, Default)]
pub struct IdentityLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl IdentityLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(slots) => slots,
                Err(poisoned) => poisoned.into_inner(),
            };
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        slot.lock_owned().await
    }

    /// Wait for exclusive access to every key in `keys`.
    ///
    /// Keys are taken in sorted order, so two callers with overlapping sets
    /// cannot deadlock.
    pub async fn acquire_all(&self, keys: &BTreeSet<String>) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(IdentityLocks::new());
        let guard = locks.acquire("cookie:c1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("cookie:c1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = IdentityLocks::new();
        let _a = locks.acquire("cookie:a").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("cookie:b"))
            .await
            .unwrap();
    }

    fn key_set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_overlapping_sets_are_exclusive() {
        let locks = Arc::new(IdentityLocks::new());
        let guards = locks.acquire_all(&key_set(&["user:u1", "cookie:c1"])).await;
        assert_eq!(guards.len(), 2);

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guards = locks.acquire_all(&key_set(&["cookie:c1"])).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guards);
        contender.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_crossing_sets_do_not_deadlock() {
        let locks = Arc::new(IdentityLocks::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let locks = Arc::clone(&locks);
            let keys = if i % 2 == 0 {
                key_set(&["user:u1", "cookie:c1"])
            } else {
                key_set(&["cookie:c1", "user:u1"])
            };
            tasks.push(tokio::spawn(async move {
                let _guards = locks.acquire_all(&keys).await;
                tokio::task::yield_now().await;
            }));
        }
        for task in tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let locks = IdentityLocks::new();
        drop(locks.acquire("cookie:a").await);
        drop(locks.acquire("cookie:b").await);
        // Acquiring prunes idle entries before inserting the new key.
        let _c = locks.acquire("cookie:c").await;
        assert_eq!(locks.tracked(), 1);
    }
}
