//! Extension target declarations
//!
//! An [`ExtensionTarget`] is one unit of work: a bridge source plus the native
//! libraries it links against. Library names are typed ([`LibraryName`]) and
//! validated when the target is declared, long before a linker sees them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors in a target declaration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target name cannot be empty")]
    EmptyName,

    #[error("invalid target name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid library name '{name}': {reason}")]
    InvalidLibrary { name: String, reason: &'static str },

    #[error("target '{name}' has no source path")]
    MissingSource { name: String },
}

/// Suffixes that mark a value as a library file name rather than a link name.
const LIBRARY_FILE_SUFFIXES: &[&str] = &[".so", ".a", ".dylib", ".tbd", ".dll", ".lib"];

/// Name of a native library as given to the linker (`-l<name>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryName(String);

impl LibraryName {
    /// Validate and wrap a library name.
    ///
    /// Rejects values the linker would misread: empty names, paths, flags,
    /// whitespace and file names such as `libfoo.so`.
    pub fn new(name: impl Into<String>) -> Result<Self, TargetError> {
        let name = name.into();
        let invalid = |reason| TargetError::InvalidLibrary {
            name: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if name.starts_with('-') {
            return Err(invalid("name cannot start with '-'"));
        }
        if name.contains(['/', '\\']) {
            return Err(invalid("use library_dirs for paths, not the library name"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("name cannot contain whitespace"));
        }
        if name.starts_with("lib") && LIBRARY_FILE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return Err(invalid("give the link name (e.g. 'foo'), not the file name"));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File names the linker accepts for this library on the host platform,
    /// in the order it prefers them.
    pub fn candidate_file_names(&self) -> Vec<String> {
        let name = &self.0;
        if cfg!(target_os = "windows") {
            vec![
                format!("{name}.lib"),
                format!("lib{name}.dll.a"),
                format!("lib{name}.a"),
            ]
        } else if cfg!(target_os = "macos") {
            vec![
                format!("lib{name}.dylib"),
                format!("lib{name}.tbd"),
                format!("lib{name}.a"),
            ]
        } else {
            vec![format!("lib{name}.so"), format!("lib{name}.a")]
        }
    }
}

impl TryFrom<String> for LibraryName {
    type Error = TargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LibraryName> for String {
    fn from(name: LibraryName) -> Self {
        name.0
    }
}

impl FromStr for LibraryName {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional compiler and linker inputs of a target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NativeOptions {
    /// Header search directories (`-I`)
    pub include_dirs: Vec<PathBuf>,
    /// Extra library search directories, searched before the host defaults
    pub library_dirs: Vec<PathBuf>,
    /// Directories embedded as runtime search paths (`-Wl,-rpath`)
    pub runtime_library_dirs: Vec<PathBuf>,
    /// Preprocessor definitions, `NAME` or `NAME=VALUE`
    pub defines: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
}

/// One extension to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionTarget {
    /// Unique target name; also the artifact's file stem
    pub name: String,
    /// Bridge source file
    pub source_path: PathBuf,
    /// Libraries to link, in link order, without duplicates
    pub link_libraries: Vec<LibraryName>,
    pub options: NativeOptions,
}

impl ExtensionTarget {
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            link_libraries: Vec::new(),
            options: NativeOptions::default(),
        }
    }

    /// Set the libraries to link; repeated names keep their first position.
    pub fn with_link_libraries(mut self, libraries: impl IntoIterator<Item = LibraryName>) -> Self {
        self.link_libraries.clear();
        for library in libraries {
            if !self.link_libraries.contains(&library) {
                self.link_libraries.push(library);
            }
        }
        self
    }

    pub fn with_options(mut self, options: NativeOptions) -> Self {
        self.options = options;
        self
    }

    /// Copy of the target with relative paths made absolute against the
    /// current directory. Tools run inside the work directory, so every path
    /// handed to them must be absolute.
    pub fn to_absolute(&self) -> Self {
        let absolute = |path: &PathBuf| std::path::absolute(path).unwrap_or_else(|_| path.clone());
        let absolute_all = |paths: &[PathBuf]| paths.iter().map(absolute).collect();

        Self {
            name: self.name.clone(),
            source_path: absolute(&self.source_path),
            link_libraries: self.link_libraries.clone(),
            options: NativeOptions {
                include_dirs: absolute_all(&self.options.include_dirs),
                library_dirs: absolute_all(&self.options.library_dirs),
                runtime_library_dirs: absolute_all(&self.options.runtime_library_dirs),
                ..self.options.clone()
            },
        }
    }

    /// Validate the declaration.
    ///
    /// Names become file names, so they are limited to ASCII letters, digits,
    /// `_`, `-` and `.`, and may not start with a dot.
    pub fn validate(&self) -> Result<(), TargetError> {
        validate_target_name(&self.name)?;

        if self.source_path.as_os_str().is_empty() {
            return Err(TargetError::MissingSource {
                name: self.name.clone(),
            });
        }

        Ok(())
    }
}

/// Check a target name without constructing a target.
pub fn validate_target_name(name: &str) -> Result<(), TargetError> {
    if name.is_empty() {
        return Err(TargetError::EmptyName);
    }
    if name.starts_with('.') {
        return Err(TargetError::InvalidName {
            name: name.to_string(),
            reason: "name cannot start with '.'",
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(TargetError::InvalidName {
            name: name.to_string(),
            reason: "only ASCII letters, digits, '_', '-' and '.' are allowed",
        });
    }
    Ok(())
}
