//! # Per-Key Mutual Exclusion
//!
//! [`KeyedMutex`] hands out one async lock per key. Operations on different
//! keys never contend; operations on the same key run one at a time, in
//! the order they reached the lock.
//!
//! The locks are `tokio::sync::Mutex` because guards are held across
//! storage awaits. The slot table itself is a `parking_lot::Mutex` that is
//! only held for the lookup, never across an await.
//!
//! Slots are stored as `Weak` references: a slot lives exactly as long as
//! someone holds or waits on it. Dead slots are pruned when new ones are
//! created, so the table does not grow with the number of keys ever seen.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A table of async mutexes keyed by `K`.
#[derive(Debug)]
pub struct KeyedMutex<K> {
    slots: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
}

/// Exclusive hold on one key. The key is released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl<K: Eq + Hash + Clone> KeyedMutex<K> {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> KeyGuard {
        let slot = self.slot(key);
        KeyGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock();
        if let Some(existing) = slots.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        slots.retain(|_, slot| slot.strong_count() > 0);
        let fresh = Arc::new(AsyncMutex::new(()));
        slots.insert(key.clone(), Arc::downgrade(&fresh));
        fresh
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self::new()
    }
}
