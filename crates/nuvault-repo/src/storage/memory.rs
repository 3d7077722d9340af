//! In-memory package storage for testing
//!
//! Keeps content bytes in a map and counts operations. Stores and deletes
//! can be switched to fail, to exercise the repository's rollback paths.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nuvault_core::{Package, Version, normalize_id};

use super::ArtifactStorage;
use crate::error::{RepoError, Result};

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub stores: usize,
    pub deletes: usize,
    pub reads: usize,
    pub metadata_updates: usize,
}

/// In-memory storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    content: Arc<Mutex<HashMap<(String, Version), Arc<Vec<u8>>>>>,
    operations: Arc<Mutex<OperationCounts>>,
    fail_stores: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `store` fail (or succeed again)
    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete` fail (or succeed again)
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.lock().clone()
    }

    /// Stored bytes for an (id, version), if any
    pub fn content_of(&self, id: &str, version: &Version) -> Option<Vec<u8>> {
        self.content
            .lock()
            .get(&(normalize_id(id), version.clone()))
            .map(|bytes| bytes.as_ref().clone())
    }

    /// Count of stored packages
    pub fn len(&self) -> usize {
        self.content.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.lock().is_empty()
    }
}

impl<P: Package> ArtifactStorage<P> for MemoryStorage {
    fn store(&self, package: &P) -> Result<()> {
        self.operations.lock().stores += 1;

        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(RepoError::storage(
                format!("storing {} {}", package.id(), package.version()),
                io::Error::other("injected store failure"),
            ));
        }

        let mut bytes = Vec::new();
        package
            .open_content()
            .and_then(|mut reader| reader.read_to_end(&mut bytes))
            .map_err(|e| {
                RepoError::storage(format!("reading {} {}", package.id(), package.version()), e)
            })?;

        self.content.lock().insert(
            (normalize_id(package.id()), package.version().clone()),
            Arc::new(bytes),
        );
        Ok(())
    }

    fn delete(&self, normalized_id: &str, version: &Version) -> Result<()> {
        self.operations.lock().deletes += 1;

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(RepoError::storage(
                format!("deleting {} {}", normalized_id, version),
                io::Error::other("injected delete failure"),
            ));
        }

        self.content
            .lock()
            .remove(&(normalized_id.to_string(), version.clone()));
        Ok(())
    }

    fn read(&self, normalized_id: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        self.operations.lock().reads += 1;

        let bytes = self
            .content
            .lock()
            .get(&(normalized_id.to_string(), version.clone()))
            .cloned()
            .ok_or_else(|| RepoError::NotFound {
                id: normalized_id.to_string(),
                version: version.clone(),
            })?;
        Ok(Box::new(Cursor::new(bytes.as_ref().clone())))
    }

    fn update_metadata(&self, _package: &P) -> Result<()> {
        self.operations.lock().metadata_updates += 1;
        Ok(())
    }
}
