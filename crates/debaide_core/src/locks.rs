//! crates/debaide_core/src/locks.rs
//!
//! Per-key mutual exclusion. Each battle, session and user gets its own async
//! mutex so read-check-write sequences on one record never interleave, while
//! unrelated records proceed in parallel.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Idle entries are swept once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

pub struct KeyedLocks<K> {
    inner: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    /// Waits until `key` is free and holds it until the guard is dropped.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        if self.inner.len() > PRUNE_THRESHOLD {
            self.prune_idle();
        }
        // The map shard guard must be released before awaiting the mutex.
        let mutex = self.inner.entry(key).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drops entries nobody is holding or waiting on.
    pub fn prune_idle(&self) {
        self.inner.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
