//! Show command - every version of one package id

use console::style;
use std::path::Path;

use super::open_source;
use crate::display;
use crate::error::{CliError, Result};

/// Run the show command
pub fn run(config: Option<&Path>, id: &str, ignore_case: bool, output_json: bool) -> Result<()> {
    let source = open_source(config)?;
    let packages = source.packages(id, ignore_case);

    if packages.is_empty() {
        return Err(not_found(&source, id, ignore_case));
    }

    if output_json {
        println!("{}", display::to_json(&packages)?);
        return Ok(());
    }

    let canonical = source.canonical_id(id).unwrap_or_else(|| id.to_string());
    println!("{}", style(canonical).bold());
    for line in display::version_details(&packages) {
        println!("  {}", line);
    }
    Ok(())
}

/// Not-found error, suggesting `--ignore-case` when only the casing differs
pub fn not_found<P: nuvault_core::Package>(
    source: &nuvault_repo::PackageSource<P>,
    id: &str,
    ignore_case: bool,
) -> CliError {
    let message = format!("No package with id {}", id);
    match source.canonical_id(id) {
        Some(canonical) if !ignore_case && canonical != id => CliError::not_found(
            message,
            format!("The id is stored as {}; pass --ignore-case to match it", canonical),
        ),
        _ => CliError::NotFound {
            message,
            help: None,
        },
    }
}
