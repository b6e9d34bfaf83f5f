//! Build descriptor parsing
//!
//! Reads `bridgebuild.toml`: a `[build]` table of settings, an optional
//! `[translator]` table, and one `[[extension]]` table per target.

use crate::target::{ExtensionTarget, LibraryName, NativeOptions, TargetError};
use crate::toolchain::TranslatorSpec;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or validating a build descriptor
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read build descriptor {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse build descriptor {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("build descriptor {} declares no [[extension]] targets", path.display())]
    NoTargets { path: PathBuf },

    #[error("duplicate target name '{name}'")]
    DuplicateTarget { name: String },

    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    #[error("unknown target '{name}' (available: {available})")]
    UnknownTarget { name: String, available: String },
}

/// Settings from the `[build]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
    /// Output directory, resolved against the descriptor's directory
    pub out_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub extension_suffix: Option<String>,
    #[serde(default)]
    pub allow_undefined: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    #[serde(default)]
    build: BuildSettings,
    translator: Option<TranslatorSpec>,
    #[serde(default)]
    extension: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    name: String,
    source_path: PathBuf,
    #[serde(default)]
    link_libraries: Vec<LibraryName>,
    #[serde(default)]
    include_dirs: Vec<PathBuf>,
    #[serde(default)]
    library_dirs: Vec<PathBuf>,
    #[serde(default)]
    runtime_library_dirs: Vec<PathBuf>,
    #[serde(default)]
    defines: Vec<String>,
    #[serde(default)]
    extra_compile_args: Vec<String>,
    #[serde(default)]
    extra_link_args: Vec<String>,
}

impl RawTarget {
    fn into_target(self, root: &Path) -> ExtensionTarget {
        let resolve_all =
            |dirs: Vec<PathBuf>| dirs.into_iter().map(|d| resolve(root, d)).collect();

        let options = NativeOptions {
            include_dirs: resolve_all(self.include_dirs),
            library_dirs: resolve_all(self.library_dirs),
            runtime_library_dirs: resolve_all(self.runtime_library_dirs),
            defines: self.defines,
            extra_compile_args: self.extra_compile_args,
            extra_link_args: self.extra_link_args,
        };

        ExtensionTarget::new(self.name, resolve(root, self.source_path))
            .with_link_libraries(self.link_libraries)
            .with_options(options)
    }
}

fn resolve(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

/// A parsed and validated build descriptor
#[derive(Debug, Clone)]
pub struct BuildDescriptor {
    /// Path the descriptor was read from
    pub path: PathBuf,
    /// Directory relative paths are resolved against
    pub root: PathBuf,
    pub settings: BuildSettings,
    pub translator: Option<TranslatorSpec>,
    /// Targets in declaration order
    pub targets: Vec<ExtensionTarget>,
}

impl BuildDescriptor {
    /// Read and validate a descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse descriptor text; `path` locates the descriptor for relative paths.
    pub fn parse(content: &str, path: &Path) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor =
            toml::from_str(content).map_err(|source| DescriptorError::Parse {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;

        if raw.extension.is_empty() {
            return Err(DescriptorError::NoTargets {
                path: path.to_path_buf(),
            });
        }

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(raw.extension.len());
        for raw_target in raw.extension {
            let target = raw_target.into_target(&root);
            target.validate()?;
            if !seen.insert(target.name.clone()) {
                return Err(DescriptorError::DuplicateTarget { name: target.name });
            }
            targets.push(target);
        }

        let mut settings = raw.build;
        settings.out_dir = settings.out_dir.map(|dir| resolve(&root, dir));

        Ok(Self {
            path: path.to_path_buf(),
            root,
            settings,
            translator: raw.translator,
            targets,
        })
    }

    /// Targets to build: all of them when `names` is empty, otherwise the
    /// named ones in declaration order.
    pub fn select(&self, names: &[String]) -> Result<Vec<ExtensionTarget>, DescriptorError> {
        if names.is_empty() {
            return Ok(self.targets.clone());
        }

        if let Some(unknown) = names
            .iter()
            .find(|name| !self.targets.iter().any(|t| &t.name == *name))
        {
            return Err(DescriptorError::UnknownTarget {
                name: unknown.clone(),
                available: self.target_names().join(", "),
            });
        }

        Ok(self
            .targets
            .iter()
            .filter(|t| names.contains(&t.name))
            .cloned()
            .collect())
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }

    /// Output directory from `[build]`, or `build/` next to the descriptor.
    pub fn default_out_dir(&self) -> PathBuf {
        self.settings
            .out_dir
            .clone()
            .unwrap_or_else(|| self.root.join("build"))
    }
}
