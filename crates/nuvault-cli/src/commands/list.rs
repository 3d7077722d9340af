//! List command - list stored packages

use std::path::Path;

use super::open_source;
use crate::display;
use crate::error::Result;

/// Run the list command
pub fn run(config: Option<&Path>, latest: bool, output_json: bool) -> Result<()> {
    let source = open_source(config)?;

    let packages = if latest {
        source.latest_packages()
    } else {
        source.all_packages()
    };
    let packages = display::sorted(packages);

    if output_json {
        println!("{}", display::to_json(&packages)?);
        return Ok(());
    }

    if packages.is_empty() {
        println!("No packages found");
        return Ok(());
    }

    display::print_listing(&packages);
    Ok(())
}
