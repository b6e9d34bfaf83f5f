//! Build input fingerprints
//!
//! A fingerprint is a SHA-256 over everything that determines an artifact:
//! the bridge source, the headers and interface files it can include, the
//! resolved library files, the target's native options and the toolchain. A
//! target whose artifact exists and whose stored fingerprint matches is not
//! rebuilt.
//!
//! Included files are every regular file under the target's `include_dirs`
//! plus the header and interface files next to the bridge source. Headers
//! reached only through the compiler's default paths or host `CFLAGS` are
//! not tracked; `--force` rebuilds after changing those.

use crate::error::{BuildError, Stage};
use crate::search_path::LinkSpec;
use crate::target::ExtensionTarget;
use crate::toolchain::Toolchain;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const FORMAT: &str = concat!("bridgebuild-fingerprint/", env!("CARGO_PKG_VERSION"));

/// Extensions of files a bridge source or its C unit may include
const INTERFACE_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "pxd", "pxi"];

/// Compute the fingerprint of a target's inputs.
///
/// `source` is the located bridge source; `link_spec` the target's resolved
/// libraries.
pub fn compute(
    target: &ExtensionTarget,
    source: &Path,
    link_spec: &LinkSpec,
    toolchain: &Toolchain,
) -> Result<String, BuildError> {
    let mut hasher = Sha256::new();
    hash_field(&mut hasher, FORMAT.as_bytes());
    hash_field(&mut hasher, target.name.as_bytes());

    hash_file(&mut hasher, source).map_err(|e| BuildError::io(Stage::Source, source, e))?;

    for file in included_files(target, source) {
        hash_field(&mut hasher, file.to_string_lossy().as_bytes());
        hash_file(&mut hasher, &file).map_err(|e| BuildError::io(Stage::Source, &file, e))?;
    }

    for library in &link_spec.libraries {
        hash_field(&mut hasher, library.name.as_str().as_bytes());
        hash_field(&mut hasher, library.path.to_string_lossy().as_bytes());
        hash_file(&mut hasher, &library.path)
            .map_err(|e| BuildError::io(Stage::Link, &library.path, e))?;
    }

    let options = serde_json::to_vec(&target.options)
        .map_err(|e| BuildError::io(Stage::Validate, &target.source_path, e.into()))?;
    hash_field(&mut hasher, &options);

    let toolchain = serde_json::to_vec(toolchain)
        .map_err(|e| BuildError::io(Stage::Validate, &target.source_path, e.into()))?;
    hash_field(&mut hasher, &toolchain);

    Ok(format!("{:x}", hasher.finalize()))
}

/// Files the build may include, sorted: everything under `include_dirs`
/// and the interface files beside `source`.
fn included_files(target: &ExtensionTarget, source: &Path) -> Vec<PathBuf> {
    let regular_files = |walk: WalkDir| {
        walk.follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
    };

    let mut files: Vec<PathBuf> = target
        .options
        .include_dirs
        .iter()
        .flat_map(|dir| regular_files(WalkDir::new(dir)))
        .collect();

    if let Some(parent) = source.parent() {
        files.extend(
            regular_files(WalkDir::new(parent).max_depth(1)).filter(|path| {
                path.as_path() != source
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| INTERFACE_EXTENSIONS.contains(&ext))
            }),
        );
    }

    files.sort();
    files.dedup();
    files
}

/// Length-prefixed so adjacent fields cannot run together
fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn hash_file(hasher: &mut Sha256, path: &Path) -> io::Result<()> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    hasher.update(len.to_le_bytes());
    io::copy(&mut file, hasher)?;
    Ok(())
}

/// Fingerprint recorded by the last successful build, if any.
pub fn load(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

pub fn store(path: &Path, fingerprint: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{fingerprint}\n"))
}
