//! Per-mover mutual exclusion within one process.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::model::MoverId;

/// One lock per mover id, created on first use.
///
/// Holding a mover's lock across read, check, and commit means two
/// operations on the same mover in this process never interleave.
/// Different movers proceed in parallel.
#[derive(Default)]
pub(super) struct MoverLocks {
    locks: Mutex<HashMap<MoverId, Arc<Mutex<()>>>>,
}

impl MoverLocks {
    /// Runs `f` while holding the lock for `id`.
    pub(super) fn with<T>(&self, id: MoverId, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(id);
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let held = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f();
        drop(held);
        self.release(id, &lock);
        result
    }

    fn lock_for(&self, id: MoverId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    /// Drops the registry entry once nobody else holds or waits on it.
    fn release(&self, id: MoverId, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the caller.
        if Arc::strong_count(lock) == 2 {
            locks.remove(&id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
