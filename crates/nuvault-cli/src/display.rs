//! Display formatting for CLI output
//!
//! Rendering returns plain strings; styling is only applied to headers when
//! printing, so the layout can be snapshot-tested.

use console::style;
use nuvault_core::{Package, PackageInfo};
use std::sync::Arc;

/// Sort for display: id case-insensitively, then version
pub fn sorted<P: Package>(mut packages: Vec<Arc<P>>) -> Vec<Arc<P>> {
    packages.sort_by(|a, b| {
        a.id()
            .to_lowercase()
            .cmp(&b.id().to_lowercase())
            .then_with(|| a.version().cmp(b.version()))
    });
    packages
}

fn id_width<P: Package>(packages: &[Arc<P>]) -> usize {
    packages
        .iter()
        .map(|p| p.id().len())
        .max()
        .unwrap_or(0)
        .max("ID".len())
}

/// Table rows (without header) for a package listing
pub fn listing_rows<P: Package>(packages: &[Arc<P>]) -> Vec<String> {
    let width = id_width(packages);

    packages
        .iter()
        .map(|p| {
            let title = p.metadata().get("title").map(String::as_str).unwrap_or("");
            format!("{:<width$}  {:<16} {}", p.id(), p.version().to_string(), title)
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Print a package listing with a styled header
pub fn print_listing<P: Package>(packages: &[Arc<P>]) {
    let width = id_width(packages);

    println!(
        "{}  {} {}",
        style(format!("{:<width$}", "ID")).bold(),
        style(format!("{:<16}", "VERSION")).bold(),
        style("TITLE").bold()
    );
    for row in listing_rows(packages) {
        println!("{}", row);
    }
}

/// Lines describing every version of one id
pub fn version_details<P: Package>(packages: &[Arc<P>]) -> Vec<String> {
    let latest = packages.iter().map(|p| p.version()).max();
    let mut lines = Vec::new();

    for package in packages {
        let marker = if Some(package.version()) == latest {
            " (latest)"
        } else {
            ""
        };
        lines.push(format!("{}{}", package.version(), marker));
        for (key, value) in package.metadata() {
            lines.push(format!("  {}: {}", key, value));
        }
    }
    lines
}

/// JSON form of a listing
pub fn to_json<P: Package>(packages: &[Arc<P>]) -> serde_json::Result<String> {
    let infos: Vec<PackageInfo> = packages.iter().map(|p| PackageInfo::of(p.as_ref())).collect();
    serde_json::to_string_pretty(&infos)
}
