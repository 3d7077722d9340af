//! nuvault Repository
//!
//! This crate provides the package repository core for nuvault:
//!
//! - **Version index**: lock-free snapshot reads of every id's versions
//! - **Case folding**: ids are matched case-insensitively, first casing wins
//! - **Push strategies**: pluggable accept/reject/replace policies, swappable at runtime
//! - **Storage**: file-tree and in-memory content stores
//!
//! ## Key Features
//!
//! - **Per-id critical sections**: pushes to different ids never wait on each other
//! - **All-or-nothing mutations**: a failed store or delete leaves the index untouched
//! - **Scoped API keys**: glob patterns over package ids
//! - **Retention**: keep only the newest N versions of each id
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nuvault_core::{PackageArtifact, Version};
//! use nuvault_repo::{AllowAnyKey, FileStorage, PackageSource};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(FileStorage::new("/var/lib/nuvault/packages")?);
//! let source: PackageSource<PackageArtifact> =
//!     PackageSource::open(storage, Arc::new(AllowAnyKey))?;
//!
//! let artifact = PackageArtifact::new("Contoso.Core", Version::parse("1.2.0")?, b"...".to_vec())?;
//! source.push_package(artifact, "my-key")?;
//!
//! let latest = source.latest_package("contoso.core", true);
//! # Ok(())
//! # }
//! ```

pub mod casefold;
pub mod config;
pub mod credentials;
pub mod error;
pub mod index;
pub mod lock;
pub mod source;
pub mod storage;
pub mod strategy;

// Re-exports for convenience
pub use casefold::CaseFoldTable;
pub use config::{RepositorySettings, RetentionPolicy, StorageSettings};
pub use credentials::{AllowAnyKey, ApiKeyEntry, ApiKeyStore, KeyValidator};
pub use error::{RepoError, Result};
pub use index::VersionIndex;
pub use lock::{IdentityGuard, IdentityLocks};
pub use source::PackageSource;
pub use storage::{ArtifactStorage, FileStorage, MemoryStorage, OperationCounts};
pub use strategy::{
    AllowOverwrite, PushDecision, PushPolicy, PushStrategy, ReadOnly, RejectExisting, RejectOlder,
};
