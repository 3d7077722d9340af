//! CLI commands

pub mod latest;
pub mod list;
pub mod push;
pub mod remove;
pub mod show;

use std::path::Path;

use nuvault_core::{PackageArtifact, Version};
use nuvault_repo::{PackageSource, RepositorySettings};

use crate::error::{CliError, Result};

/// Load settings from `--config`, or the default location
pub fn load_settings(config: Option<&Path>) -> Result<RepositorySettings> {
    let settings = match config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config {
                    message: format!("Settings file not found: {}", path.display()),
                    help: Some("Pass --config or set NUVAULT_CONFIG to an existing file".into()),
                });
            }
            RepositorySettings::load_from(path)?
        }
        None => RepositorySettings::load()?,
    };
    Ok(settings)
}

/// Open the package source the settings describe
pub fn open_source(config: Option<&Path>) -> Result<PackageSource<PackageArtifact>> {
    let settings = load_settings(config)?;
    tracing::debug!("Using storage at {}", settings.storage.root.display());
    Ok(settings.build_source()?)
}

/// Parse a version argument
pub fn parse_version(input: &str) -> Result<Version> {
    Version::parse(input).map_err(|e| CliError::input(e.to_string()))
}
