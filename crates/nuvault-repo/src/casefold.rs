//! Canonical id casing
//!
//! Package ids are matched case-insensitively, but the casing used by the
//! first successful push is kept as the canonical form and never changes.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use nuvault_core::normalize_id;

/// Registry of canonical casings, keyed by normalized id
///
/// Reads load an immutable snapshot; registrations publish a new one.
#[derive(Debug, Default)]
pub struct CaseFoldTable {
    entries: ArcSwap<HashMap<String, String>>,
}

impl CaseFoldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-folded lookup key for an id
    pub fn normalize(&self, id: &str) -> String {
        normalize_id(id)
    }

    /// Register `id`, returning the canonical casing for its normalized form
    ///
    /// The first registration wins; later calls get the stored casing back
    /// whatever casing they pass in.
    pub fn register(&self, id: &str) -> String {
        self.register_new(id).0
    }

    /// Like [`register`](Self::register), also reporting whether the entry was created
    pub(crate) fn register_new(&self, id: &str) -> (String, bool) {
        let key = normalize_id(id);
        let mut outcome = (id.to_string(), true);

        self.entries.rcu(|current| {
            if let Some(existing) = current.get(&key) {
                outcome = (existing.clone(), false);
                return Arc::clone(current);
            }
            outcome = (id.to_string(), true);
            let mut next = (**current).clone();
            next.insert(key.clone(), id.to_string());
            Arc::new(next)
        });

        outcome
    }

    /// Stored canonical casing for a normalized id
    pub fn canonical_of(&self, normalized_id: &str) -> Option<String> {
        self.entries.load().get(normalized_id).cloned()
    }

    /// Resolve a lookup id to the normalized index key
    ///
    /// With `ignore_case` the id is folded. Without it, the id must equal the
    /// canonical casing exactly.
    pub fn resolve(&self, id: &str, ignore_case: bool) -> Option<String> {
        if id.is_empty() {
            return None;
        }
        let key = normalize_id(id);
        let entries = self.entries.load();
        match entries.get(&key) {
            Some(_) if ignore_case => Some(key),
            Some(canonical) if canonical == id => Some(key),
            _ => None,
        }
    }

    /// Drop an entry; only used to undo a registration inside a failed push
    pub(crate) fn forget(&self, normalized_id: &str) {
        self.entries.rcu(|current| {
            if !current.contains_key(normalized_id) {
                return Arc::clone(current);
            }
            let mut next = (**current).clone();
            next.remove(normalized_id);
            Arc::new(next)
        });
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}
