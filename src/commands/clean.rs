//! Clean command
//!
//! Remove built artifacts, intermediates and fingerprints

use super::{Project, ProjectArgs, display_path, format_bytes};
use anyhow::{Context, Result};
use bridgebuild::OutputLayout;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Remove build outputs for all (or the selected) targets
pub(crate) fn run(args: &ProjectArgs, names: &[String], dry_run: bool) -> Result<()> {
    let project = Project::load(args)?;
    let layout = OutputLayout::new(&project.out_dir, project.toolchain.extension_suffix.clone());

    let mut candidates = Vec::new();
    if names.is_empty() {
        for target in &project.descriptor.targets {
            candidates.push(layout.artifact_path(&target.name));
        }
        candidates.push(layout.work_root());
    } else {
        for target in project.targets(names)? {
            candidates.push(layout.artifact_path(&target.name));
            // Holds the fingerprint too
            candidates.push(layout.work_dir(&target.name));
        }
    }

    let existing: Vec<(PathBuf, u64)> = candidates
        .into_iter()
        .filter(|path| path.exists())
        .map(|path| {
            let size = calculate_size(&path);
            (path, size)
        })
        .collect();

    if existing.is_empty() {
        println!("Nothing to clean in {}", layout.out_dir().display());
        return Ok(());
    }

    if dry_run {
        println!("Dry run mode - nothing will be removed\n");
    }

    let cwd = env::current_dir().unwrap_or_default();
    let mut space_freed: u64 = 0;
    for (path, size) in &existing {
        let shown = display_path(path, &cwd);
        if dry_run {
            println!("Would remove: {shown} ({})", format_bytes(*size));
        } else {
            println!("Removing: {shown} ({})", format_bytes(*size));
            remove_path(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        space_freed += size;
    }

    println!();
    if dry_run {
        println!(
            "Would remove {} item(s), freeing {}",
            existing.len(),
            format_bytes(space_freed)
        );
    } else {
        println!("Done");
        println!("   Freed {} of disk space", format_bytes(space_freed));
    }

    Ok(())
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Total size of a file or directory tree
fn calculate_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
