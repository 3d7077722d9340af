//! Storage collaborators for package content
//!
//! The index lives in memory; the bytes (and enough metadata to rebuild the
//! index) live behind an [`ArtifactStorage`]:
//! - **File**: one directory per id and version under a root directory
//! - **Memory**: in-process, with failure injection for tests

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::{MemoryStorage, OperationCounts};

use std::io::Read;

use nuvault_core::{Package, Version};

use crate::error::Result;

/// Persistence for package artifacts
///
/// Implementations must be Send + Sync; different ids are stored
/// concurrently. Ids passed to `delete` and `read` are normalized.
pub trait ArtifactStorage<P: Package>: Send + Sync {
    /// Persist the package content. All-or-nothing: on error, whatever was
    /// stored before for this (id, version) is still intact.
    fn store(&self, package: &P) -> Result<()>;

    /// Remove a stored package; a no-op when nothing is stored
    fn delete(&self, normalized_id: &str, version: &Version) -> Result<()>;

    /// Open stored content
    fn read(&self, normalized_id: &str, version: &Version) -> Result<Box<dyn Read + Send>>;

    /// Persist refreshed metadata
    fn update_metadata(&self, package: &P) -> Result<()> {
        let _ = package;
        Ok(())
    }

    /// Every stored package, used to rebuild the index on open
    fn load_all(&self) -> Result<Vec<P>> {
        Ok(Vec::new())
    }
}
