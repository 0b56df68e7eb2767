use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutexes keyed by name, created on demand.
#[derive(Default)]
pub(super) struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Waits for exclusive access to `key`.
    pub(super) async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        KeyedGuard {
            owner: self,
            key: key.to_owned(),
            guard: Some(entry.lock_owned().await),
        }
    }

    async fn release(&self, key: &str) {
        let mut locks = self.locks.lock().await;
        // Only the map itself still references an idle lock.
        if locks
            .get(key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    pub(super) async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Holds one key's lock until [`KeyedGuard::unlock`] is awaited.
pub(super) struct KeyedGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedGuard<'_> {
    /// Releases the key and drops its map entry when nobody else waits on it.
    pub(super) async fn unlock(mut self) {
        drop(self.guard.take());
        self.owner.release(self.key.as_str()).await;
    }
}
