//! Per-identity write serialization
//!
//! Every normalized id gets its own mutex. Writers of the same id queue up on
//! it; writers of different ids never contend beyond the brief registry lookup.

use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// Guard held for the duration of one mutation of an id
pub type IdentityGuard = ArcMutexGuard<RawMutex, ()>;

/// Registry of per-id mutexes
#[derive(Debug, Default)]
pub struct IdentityLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the critical section for `normalized_id` is ours
    pub fn acquire(&self, normalized_id: &str) -> IdentityGuard {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(normalized_id.to_string()).or_default())
        };
        lock.lock_arc()
    }

    /// Non-blocking variant of [`acquire`](Self::acquire)
    pub fn try_acquire(&self, normalized_id: &str) -> Option<IdentityGuard> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(normalized_id.to_string()).or_default())
        };
        lock.try_lock_arc()
    }

    /// Number of ids that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
