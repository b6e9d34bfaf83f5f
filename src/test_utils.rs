//! Shared fixtures for unit tests
//!
//! A [`BuildFixture`] is a scratch project: bridge sources under `src/`, a
//! private library directory under `lib/`, and an output directory under
//! `out/`. Its toolchain uses `cp` as the translator, so a "bridge source" is
//! just the C unit it should become.

use crate::extensions::{BuildOptions, ExtensionBuilder};
use crate::search_path::{LibrarySearchPath, SearchOrigin};
use crate::target::LibraryName;
use crate::toolchain::{Toolchain, TranslatorSpec, find_executable};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// True if a host C compiler is available; tests that link skip otherwise.
pub(crate) fn has_c_compiler() -> bool {
    find_executable("cc").is_some()
}

/// Toolchain whose translator copies the source to the unit unchanged
pub(crate) fn copy_toolchain() -> Toolchain {
    Toolchain {
        translator: TranslatorSpec {
            program: "cp".to_string(),
            args: vec!["{source}".to_string(), "{output}".to_string()],
            output_extension: "c".to_string(),
        },
        ..Toolchain::default()
    }
}

pub(crate) struct BuildFixture {
    temp: TempDir,
}

impl BuildFixture {
    pub(crate) fn new() -> Self {
        Self {
            temp: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub(crate) fn path(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }

    pub(crate) fn lib_dir(&self) -> PathBuf {
        self.path("lib")
    }

    pub(crate) fn out_dir(&self) -> PathBuf {
        self.path("out")
    }

    pub(crate) fn work_dir(&self, target: &str) -> PathBuf {
        self.out_dir().join(".bridgebuild").join(target)
    }

    /// Write `src/<name>.bridge` and return its path.
    pub(crate) fn write_source(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(&format!("src/{name}.bridge"));
        fs::create_dir_all(self.path("src")).expect("Failed to create src dir");
        fs::write(&path, content).expect("Failed to write bridge source");
        path
    }

    /// Create an empty shared library file for `name` in the fixture's lib dir.
    pub(crate) fn touch_library(&self, name: &str) -> PathBuf {
        let library = LibraryName::new(name).expect("valid library name");
        let file_name = library
            .candidate_file_names()
            .into_iter()
            .next()
            .expect("at least one candidate");
        fs::create_dir_all(self.lib_dir()).expect("Failed to create lib dir");
        let path = self.lib_dir().join(file_name);
        fs::write(&path, b"").expect("Failed to write library");
        path
    }

    /// Builder searching only the fixture's lib dir.
    pub(crate) fn builder(&self, options: BuildOptions) -> ExtensionBuilder {
        let mut search_path = LibrarySearchPath::new();
        search_path.push(self.lib_dir(), SearchOrigin::Config);
        ExtensionBuilder::new(copy_toolchain(), search_path, self.out_dir(), options)
    }
}
