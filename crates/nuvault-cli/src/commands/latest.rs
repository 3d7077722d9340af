//! Latest command - highest version of a package id

use std::path::Path;

use nuvault_core::Package;

use super::open_source;
use super::show::not_found;
use crate::error::Result;

/// Run the latest command
pub fn run(config: Option<&Path>, id: &str, ignore_case: bool) -> Result<()> {
    let source = open_source(config)?;
    let latest = source
        .latest_package(id, ignore_case)
        .ok_or_else(|| not_found(&source, id, ignore_case))?;

    println!("{} {}", latest.id(), latest.version());
    Ok(())
}
