//! Build descriptor discovery and output layout.

use crate::env_vars;
use std::path::{Path, PathBuf};

/// File name of the build descriptor
pub const DESCRIPTOR_FILE: &str = "bridgebuild.toml";

/// Directory under the output directory holding intermediates and fingerprints
pub const WORK_DIR_NAME: &str = ".bridgebuild";

/// Find the build descriptor for the current directory.
/// Priority: `BRIDGEBUILD_MANIFEST` env var -> ./bridgebuild.toml
#[must_use]
pub fn find_descriptor() -> PathBuf {
    if let Some(manifest) = env_vars::manifest() {
        return PathBuf::from(manifest);
    }

    find_descriptor_in(".")
}

/// Path of the build descriptor in `dir`. A directory argument is joined
/// with the descriptor file name; anything else is returned unchanged.
#[must_use]
pub fn find_descriptor_in(dir: impl AsRef<Path>) -> PathBuf {
    let dir = dir.as_ref();
    if dir.is_dir() {
        dir.join(DESCRIPTOR_FILE)
    } else {
        dir.to_path_buf()
    }
}

/// Where one build run writes its files.
///
/// ```text
/// <out_dir>/pkgcraft.so                         artifact
/// <out_dir>/.bridgebuild/pkgcraft/              intermediates
/// <out_dir>/.bridgebuild/pkgcraft/.fingerprint  last successful inputs
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    out_dir: PathBuf,
    extension_suffix: String,
}

impl OutputLayout {
    pub fn new(out_dir: impl Into<PathBuf>, extension_suffix: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            extension_suffix: extension_suffix.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn artifact_file_name(&self, target: &str) -> String {
        format!("{target}{}", self.extension_suffix)
    }

    pub fn artifact_path(&self, target: &str) -> PathBuf {
        self.out_dir.join(self.artifact_file_name(target))
    }

    /// Root of all intermediates
    pub fn work_root(&self) -> PathBuf {
        self.out_dir.join(WORK_DIR_NAME)
    }

    /// Per-target intermediates directory
    pub fn work_dir(&self, target: &str) -> PathBuf {
        self.work_root().join(target)
    }

    /// Inside the work dir; target names never start with `.`, so no
    /// intermediate can share the name.
    pub fn fingerprint_path(&self, target: &str) -> PathBuf {
        self.work_dir(target).join(".fingerprint")
    }
}
