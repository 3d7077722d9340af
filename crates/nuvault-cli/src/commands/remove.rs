//! Remove command - delete one package version

use console::style;
use std::path::Path;

use super::{open_source, parse_version};
use crate::error::Result;

/// Run the remove command
pub fn run(config: Option<&Path>, id: &str, version: &str) -> Result<()> {
    let version = parse_version(version)?;
    let source = open_source(config)?;

    if source.package(id, &version, true).is_none() {
        println!("{} {} is not stored, nothing to remove", id, version);
        return Ok(());
    }

    source.remove_package(id, &version)?;
    println!("{} {} {}", style("Removed").green().bold(), id, version);
    Ok(())
}
