//! nuvault Core - Core types for the package repository
//!
//! This crate provides the foundational types used throughout nuvault:
//! - `Version`: four-part package version with prerelease labels and a total order
//! - `Package`: the capability set the repository needs from an artifact handle
//! - `PackageArtifact`: the shipped artifact handle (in-memory or file-backed content)
//! - Package id validation and case folding

pub mod error;
pub mod package;
pub mod version;

pub use error::{CoreError, Result};
pub use package::{
    ContentSource, MAX_ID_LENGTH, Metadata, Package, PackageArtifact, PackageInfo, normalize_id,
    validate_id,
};
pub use version::Version;
