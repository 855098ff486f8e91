//! Per-key async mutex registry.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one async mutex per key.
///
/// Multi-key acquisition always locks in ascending key order, so two callers
/// locking overlapping key sets cannot deadlock.
///
/// Entries stay in the registry after their guard is dropped; call
/// [`KeyedLocks::prune`] to drop the ones nobody holds or waits on.
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Ord + Copy,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn handle(&self, key: K) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key).or_default().value())
    }

    /// Locks a single key.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        self.handle(key).lock_owned().await
    }

    /// Locks several keys in ascending order; duplicates are locked once.
    pub async fn lock_many(&self, keys: &[K]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.handle(key).lock_owned().await);
        }
        guards
    }

    /// Drops every entry that is neither held nor awaited.
    ///
    /// A handle handed out by `lock` keeps its entry alive, so pruning never
    /// separates two callers of the same key.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Returns true if the key is currently held.
    pub fn is_locked(&self, key: K) -> bool {
        self.locks
            .get(&key)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Ord + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<u32>::new());
        let guard = locks.lock(1).await;
        assert!(locks.is_locked(1));
        assert!(!locks.is_locked(2));

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(!locks.is_locked(1));
    }

    #[tokio::test]
    async fn test_lock_many_dedups() {
        let locks = KeyedLocks::<u32>::new();
        let guards = locks.lock_many(&[3, 1, 3, 2]).await;
        assert_eq!(guards.len(), 3);
        assert!(locks.is_locked(1));
        assert!(locks.is_locked(3));
    }

    #[tokio::test]
    async fn test_prune_keeps_held_keys() {
        let locks = KeyedLocks::<u32>::new();
        let held = locks.lock(1).await;
        drop(locks.lock(2).await);
        assert_eq!(locks.len(), 2);

        locks.prune();
        assert_eq!(locks.len(), 1);
        assert!(locks.is_locked(1));

        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_opposite_order_does_not_deadlock() {
        let locks = Arc::new(KeyedLocks::<u32>::new());
        let tasks = (0..50).map(|i| {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let keys = if i % 2 == 0 { [1, 2] } else { [2, 1] };
                let _guards = locks.lock_many(&keys).await;
                tokio::task::yield_now().await;
            })
        });
        let joined = tokio::time::timeout(Duration::from_secs(5), futures::future::join_all(tasks))
            .await
            .expect("lock ordering deadlocked");
        assert!(joined.iter().all(Result::is_ok));
    }
}
