//! In-memory version index
//!
//! Maps normalized ids to their artifacts, kept in ascending version order.
//! Readers load an immutable snapshot and never block; writers publish a new
//! snapshot through `ArcSwap::rcu`, so writers of different ids never lose
//! each other's updates.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nuvault_core::{Metadata, Package, Version, normalize_id};

use crate::error::{RepoError, Result};

type Versions<P> = Arc<Vec<Arc<P>>>;
type Snapshot<P> = HashMap<String, Versions<P>>;

/// Normalized id -> artifacts ordered by version
pub struct VersionIndex<P> {
    snap: ArcSwap<Snapshot<P>>,
}

impl<P> Default for VersionIndex<P> {
    fn default() -> Self {
        Self {
            snap: ArcSwap::from_pointee(HashMap::new()),
        }
    }
}

impl<P> fmt::Debug for VersionIndex<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snap.load();
        f.debug_struct("VersionIndex")
            .field("ids", &snap.len())
            .field("artifacts", &snap.values().map(|v| v.len()).sum::<usize>())
            .finish()
    }
}

impl<P: Package> VersionIndex<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every indexed artifact, in no particular order
    pub fn all(&self) -> Vec<Arc<P>> {
        self.snap
            .load()
            .values()
            .flat_map(|versions| versions.iter().cloned())
            .collect()
    }

    /// Artifacts for an id, lowest version first
    pub fn packages_for(&self, normalized_id: &str) -> Vec<Arc<P>> {
        self.snap
            .load()
            .get(normalized_id)
            .map(|versions| versions.as_ref().clone())
            .unwrap_or_default()
    }

    /// Highest version of an id
    pub fn latest_for(&self, normalized_id: &str) -> Option<Arc<P>> {
        self.snap
            .load()
            .get(normalized_id)
            .and_then(|versions| versions.last().cloned())
    }

    /// Highest version of every id that has at least one artifact
    pub fn latest_all(&self) -> Vec<Arc<P>> {
        self.snap
            .load()
            .values()
            .filter_map(|versions| versions.last().cloned())
            .collect()
    }

    /// Exact (id, version) lookup
    pub fn get(&self, normalized_id: &str, version: &Version) -> Option<Arc<P>> {
        let snap = self.snap.load();
        let versions = snap.get(normalized_id)?;
        versions
            .binary_search_by(|p| p.version().cmp(version))
            .ok()
            .map(|pos| Arc::clone(&versions[pos]))
    }

    /// Add an artifact; fails if its (id, version) is already indexed
    pub fn insert(&self, package: Arc<P>) -> Result<()> {
        let key = normalize_id(package.id());
        let mut outcome = Ok(());

        self.snap.rcu(|current| {
            let existing = current.get(&key).map(|v| v.as_slice()).unwrap_or(&[]);
            match existing.binary_search_by(|p| p.version().cmp(package.version())) {
                Ok(_) => {
                    outcome = Err(RepoError::Conflict {
                        id: package.id().to_string(),
                        version: package.version().clone(),
                    });
                    Arc::clone(current)
                }
                Err(pos) => {
                    outcome = Ok(());
                    let mut versions = existing.to_vec();
                    versions.insert(pos, Arc::clone(&package));
                    Arc::new(with_versions(current, &key, versions))
                }
            }
        });

        outcome
    }

    /// Put an artifact in place of the one with the same identity
    ///
    /// Inserts when nothing is there yet. Returns the replaced artifact.
    pub fn replace(&self, package: Arc<P>) -> Option<Arc<P>> {
        let key = normalize_id(package.id());
        let mut previous = None;

        self.snap.rcu(|current| {
            let mut versions = current
                .get(&key)
                .map(|v| v.as_ref().clone())
                .unwrap_or_default();
            match versions.binary_search_by(|p| p.version().cmp(package.version())) {
                Ok(pos) => {
                    previous = Some(std::mem::replace(&mut versions[pos], Arc::clone(&package)));
                }
                Err(pos) => {
                    previous = None;
                    versions.insert(pos, Arc::clone(&package));
                }
            }
            Arc::new(with_versions(current, &key, versions))
        });

        previous
    }

    /// Remove an artifact; a no-op when it is not indexed
    pub fn remove(&self, normalized_id: &str, version: &Version) -> Option<Arc<P>> {
        let mut removed = None;

        self.snap.rcu(|current| {
            removed = None;
            let Some(existing) = current.get(normalized_id) else {
                return Arc::clone(current);
            };
            let Ok(pos) = existing.binary_search_by(|p| p.version().cmp(version)) else {
                return Arc::clone(current);
            };
            let mut versions = existing.as_ref().clone();
            removed = Some(versions.remove(pos));
            Arc::new(with_versions(current, normalized_id, versions))
        });

        removed
    }

    /// Swap the metadata of an indexed artifact
    pub fn replace_metadata(
        &self,
        normalized_id: &str,
        version: &Version,
        metadata: Metadata,
    ) -> Result<Arc<P>> {
        let current = self
            .get(normalized_id, version)
            .ok_or_else(|| RepoError::NotFound {
                id: normalized_id.to_string(),
                version: version.clone(),
            })?;

        let refreshed = Arc::new(current.with_metadata(metadata));
        self.replace(Arc::clone(&refreshed));
        Ok(refreshed)
    }

    /// Normalized ids with at least one artifact
    pub fn ids(&self) -> Vec<String> {
        self.snap
            .load()
            .iter()
            .filter(|(_, versions)| !versions.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Total number of indexed artifacts
    pub fn len(&self) -> usize {
        self.snap.load().values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copy of `current` with one id's version list swapped; empty lists are dropped
fn with_versions<P>(current: &Snapshot<P>, key: &str, versions: Vec<Arc<P>>) -> Snapshot<P> {
    let mut next = current.clone();
    if versions.is_empty() {
        next.remove(key);
    } else {
        next.insert(key.to_string(), Arc::new(versions));
    }
    next
}
