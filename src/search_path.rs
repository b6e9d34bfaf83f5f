//! Native library search path and link-spec resolution
//!
//! The search path is assembled once, before any target builds, from the
//! same places a Unix linker looks: `-L` flags, `LIBRARY_PATH`, the
//! compiler's built-in directories and the platform defaults. Each target
//! then resolves its library names against it into a [`LinkSpec`] before a
//! single tool runs, so a missing library fails fast and names itself.

use crate::env_vars::HostEnvironment;
use crate::error::LinkError;
use crate::target::{ExtensionTarget, LibraryName};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a search directory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrigin {
    /// The target's own `library_dirs`
    Target,
    /// `-L` in `LDFLAGS`
    Ldflags,
    /// `LIBRARY_PATH`
    Environment,
    /// User config `library_dirs`
    Config,
    /// Reported by the compiler driver
    Compiler,
    /// Platform default
    System,
}

impl SearchOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Ldflags => "LDFLAGS",
            Self::Environment => "LIBRARY_PATH",
            Self::Config => "config",
            Self::Compiler => "compiler",
            Self::System => "system",
        }
    }

    /// The linker searches these directories on its own; passing them as
    /// `-L` could reorder its search.
    const fn is_implicit(self) -> bool {
        matches!(self, Self::Compiler | Self::System)
    }
}

impl fmt::Display for SearchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchDir {
    pub path: PathBuf,
    pub origin: SearchOrigin,
}

/// Shared or static library file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Shared,
    Static,
}

impl LibraryKind {
    fn from_file_name(file_name: &str) -> Self {
        if file_name.ends_with(".a") && !file_name.ends_with(".dll.a") {
            Self::Static
        } else {
            Self::Shared
        }
    }
}

/// A library name resolved to a file on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLibrary {
    pub name: LibraryName,
    pub path: PathBuf,
    pub kind: LibraryKind,
    pub origin: SearchOrigin,
}

/// Everything the link step needs to know about a target's libraries
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LinkSpec {
    /// Resolved libraries, in link order
    pub libraries: Vec<ResolvedLibrary>,
    /// Directories to pass as `-L`, in search order
    pub search_dirs: Vec<PathBuf>,
}

impl LinkSpec {
    /// `-L` and `-l` arguments for the linker.
    pub fn link_args(&self) -> Vec<String> {
        self.search_dirs
            .iter()
            .map(|dir| format!("-L{}", dir.display()))
            .chain(self.libraries.iter().map(|lib| format!("-l{}", lib.name)))
            .collect()
    }

    /// Files whose contents determine the link result.
    pub fn library_files(&self) -> impl Iterator<Item = &Path> {
        self.libraries.iter().map(|lib| lib.path.as_path())
    }
}

/// Ordered, de-duplicated list of library directories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibrarySearchPath {
    dirs: Vec<SearchDir>,
}

impl LibrarySearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory unless it is already present.
    ///
    /// Relative directories are made absolute against the current directory,
    /// since the linker runs from a per-target work dir.
    pub fn push(&mut self, path: impl Into<PathBuf>, origin: SearchOrigin) {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return;
        }
        let path = if path.is_relative() {
            std::path::absolute(&path).unwrap_or(path)
        } else {
            path
        };
        if self.dirs.iter().any(|d| d.path == path) {
            return;
        }
        self.dirs.push(SearchDir { path, origin });
    }

    /// Build the host search path.
    ///
    /// `compiler_dirs` is the output of `<cc> -print-search-dirs`, if the
    /// compiler could be queried.
    pub fn discover(
        host: &HostEnvironment,
        config_dirs: &[PathBuf],
        compiler_dirs: Option<&str>,
    ) -> Self {
        let mut search_path = Self::new();

        for dir in parse_ldflags_dirs(&host.ldflags) {
            search_path.push(dir, SearchOrigin::Ldflags);
        }
        for dir in &host.library_path {
            search_path.push(dir, SearchOrigin::Environment);
        }
        for dir in config_dirs {
            search_path.push(dir, SearchOrigin::Config);
        }
        for dir in compiler_dirs
            .map(parse_print_search_dirs)
            .unwrap_or_default()
        {
            search_path.push(dir, SearchOrigin::Compiler);
        }
        for dir in system_library_dirs() {
            search_path.push(dir, SearchOrigin::System);
        }

        crate::debug!(
            "library search path: {}",
            search_path
                .dirs
                .iter()
                .map(|d| d.path.display().to_string())
                .collect::<Vec<_>>()
                .join(":")
        );
        search_path
    }

    pub fn dirs(&self) -> &[SearchDir] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// This search path with a target's own directories searched first.
    pub fn with_target_dirs(&self, target_dirs: &[PathBuf]) -> Self {
        let mut search_path = Self::new();
        for dir in target_dirs {
            search_path.push(dir, SearchOrigin::Target);
        }
        for dir in &self.dirs {
            search_path.push(dir.path.clone(), dir.origin);
        }
        search_path
    }

    /// First directory holding a file for `name`, mirroring the linker:
    /// directories are tried in order, and within one directory shared
    /// libraries win over static archives.
    pub fn find(&self, name: &LibraryName) -> Option<ResolvedLibrary> {
        let candidates = name.candidate_file_names();
        self.dirs.iter().find_map(|dir| {
            candidates.iter().find_map(|file_name| {
                let path = dir.path.join(file_name);
                path.is_file().then(|| ResolvedLibrary {
                    name: name.clone(),
                    kind: LibraryKind::from_file_name(file_name),
                    path,
                    origin: dir.origin,
                })
            })
        })
    }

    /// Resolve every library of `target` into a [`LinkSpec`].
    ///
    /// Fails on the first library, in declaration order, that cannot be found.
    pub fn resolve(&self, target: &ExtensionTarget) -> Result<LinkSpec, LinkError> {
        let search_path = self.with_target_dirs(&target.options.library_dirs);

        let mut spec = LinkSpec::default();
        for dir in &target.options.library_dirs {
            push_unique(&mut spec.search_dirs, dir.clone());
        }

        for name in &target.link_libraries {
            let Some(library) = search_path.find(name) else {
                return Err(LinkError::unresolved_library(
                    name.as_str(),
                    search_path.dirs.iter().map(|d| d.path.clone()).collect(),
                ));
            };

            crate::debug!(
                "{}: -l{} -> {} ({})",
                target.name,
                name,
                library.path.display(),
                library.origin
            );

            if !library.origin.is_implicit()
                && let Some(parent) = library.path.parent()
            {
                push_unique(&mut spec.search_dirs, parent.to_path_buf());
            }
            spec.libraries.push(library);
        }

        Ok(spec)
    }
}

fn push_unique(dirs: &mut Vec<PathBuf>, dir: PathBuf) {
    if !dirs.contains(&dir) {
        dirs.push(dir);
    }
}

/// `-L` directories from linker flags (`-L/opt/lib` and `-L /opt/lib`).
pub fn parse_ldflags_dirs(flags: &[String]) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        if flag == "-L" {
            if let Some(dir) = iter.next() {
                dirs.push(PathBuf::from(dir));
            }
        } else if let Some(dir) = flag.strip_prefix("-L") {
            dirs.push(PathBuf::from(dir));
        }
    }
    dirs
}

/// Library directories from `-print-search-dirs` output.
///
/// Only the `libraries: =` line matters. Entries are canonicalized so the
/// `lib/gcc/x86_64-linux-gnu/13/../../../` spellings dedupe against the
/// platform defaults; entries that do not exist are dropped.
pub fn parse_print_search_dirs(output: &str) -> Vec<PathBuf> {
    let Some(line) = output
        .lines()
        .find_map(|line| line.strip_prefix("libraries:"))
    else {
        return Vec::new();
    };
    let line = line.trim_start().trim_start_matches('=');

    std::env::split_paths(line)
        .filter(|p| !p.as_os_str().is_empty())
        .filter_map(|p| fs::canonicalize(p).ok())
        .filter(|p| p.is_dir())
        .collect()
}

/// Platform default library directories that exist on this host.
pub fn system_library_dirs() -> Vec<PathBuf> {
    let candidates: Vec<String> = if cfg!(target_os = "macos") {
        vec![
            "/opt/homebrew/lib".to_string(),
            "/usr/local/lib".to_string(),
            "/usr/lib".to_string(),
        ]
    } else if cfg!(target_os = "linux") {
        let multiarch = format!("{}-linux-gnu", std::env::consts::ARCH);
        vec![
            "/usr/local/lib".to_string(),
            "/usr/local/lib64".to_string(),
            format!("/usr/lib/{multiarch}"),
            "/usr/lib64".to_string(),
            "/usr/lib".to_string(),
            format!("/lib/{multiarch}"),
            "/lib64".to_string(),
            "/lib".to_string(),
        ]
    } else if cfg!(unix) {
        vec![
            "/usr/local/lib".to_string(),
            "/usr/lib".to_string(),
            "/lib".to_string(),
        ]
    } else {
        Vec::new()
    };

    candidates
        .into_iter()
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
        .collect()
}
