//! Push command - add a package file to the repository

use console::style;
use std::path::Path;

use nuvault_core::{Package, PackageArtifact};

use super::{open_source, parse_version};
use crate::error::{CliError, Result};

/// Push a package file under the given id and version
pub fn run(
    config: Option<&Path>,
    file: &Path,
    id: &str,
    version: &str,
    api_key: &str,
    meta: &[String],
) -> Result<()> {
    if !file.is_file() {
        return Err(CliError::input(format!(
            "Package file not found: {}",
            file.display()
        )));
    }

    let version = parse_version(version)?;
    let mut artifact = PackageArtifact::from_file(id, version, file)?;
    for (key, value) in parse_meta(meta)? {
        artifact = artifact.meta(key, value);
    }

    let source = open_source(config)?;
    let (id, version) = (artifact.id().to_string(), artifact.version().clone());

    if source.push_package(artifact, api_key)? {
        println!("{} {} {}", style("Pushed").green().bold(), id, version);
        Ok(())
    } else {
        Err(CliError::Rejected {
            id,
            version: version.to_string(),
            policy: source.push_strategy().name().to_string(),
        })
    }
}

/// Parse `key=value` metadata arguments
fn parse_meta(meta: &[String]) -> Result<Vec<(String, String)>> {
    meta.iter()
        .map(|entry| {
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                CliError::input(format!("Invalid --meta '{}', expected key=value", entry))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::input(format!("Empty key in --meta '{}'", entry)));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}
