//! Build error taxonomy
//!
//! Every failure of a target is a [`BuildError`] tagged with the pipeline
//! [`Stage`] it happened in. Diagnostics from external tools are carried
//! verbatim.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Pipeline stage of a single target build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Target declaration checks
    Validate,
    /// Locating the bridge source
    Source,
    /// Bridge source -> native compilation unit
    Translate,
    /// Compilation unit -> object file
    Compile,
    /// Library resolution and linking
    Link,
    /// Moving the artifact into the output directory
    Install,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Source => "source",
            Self::Translate => "translate",
            Self::Compile => "compile",
            Self::Link => "link",
            Self::Install => "install",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link-stage failures
#[derive(Debug, Error)]
pub enum LinkError {
    /// A named library could not be found on the search path
    #[error("unresolved library '{name}'")]
    UnresolvedLibrary {
        name: String,
        /// Directories searched, empty when reported by the linker itself
        searched: Vec<PathBuf>,
    },

    /// A referenced symbol is not exported by any linked library
    #[error("unresolved symbol '{symbol}'")]
    UnresolvedSymbol { symbol: String, diagnostics: String },

    /// Any other linker failure
    #[error("linking failed")]
    Failed { diagnostics: String },
}

impl LinkError {
    pub fn unresolved_library(name: impl Into<String>, searched: Vec<PathBuf>) -> Self {
        Self::UnresolvedLibrary {
            name: name.into(),
            searched,
        }
    }
}

/// Errors that fail a single extension target
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("bridge source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("translation failed")]
    TranslationError { diagnostics: String },

    #[error("compilation failed")]
    CompileError { diagnostics: String },

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Create an I/O error with stage and path context
    pub fn io(stage: Stage, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            stage,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn source_not_found(path: impl AsRef<Path>) -> Self {
        Self::SourceNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn translation(diagnostics: impl Into<String>) -> Self {
        Self::TranslationError {
            diagnostics: diagnostics.into(),
        }
    }

    pub fn compile(diagnostics: impl Into<String>) -> Self {
        Self::CompileError {
            diagnostics: diagnostics.into(),
        }
    }

    /// The pipeline stage this error belongs to
    pub const fn stage(&self) -> Stage {
        match self {
            Self::InvalidTarget { .. } => Stage::Validate,
            Self::SourceNotFound { .. } => Stage::Source,
            Self::TranslationError { .. } => Stage::Translate,
            Self::CompileError { .. } => Stage::Compile,
            Self::Link(_) => Stage::Link,
            Self::Io { stage, .. } => *stage,
        }
    }

    /// Raw output of the external tool that failed, if any
    pub fn diagnostics(&self) -> Option<&str> {
        let text = match self {
            Self::TranslationError { diagnostics }
            | Self::CompileError { diagnostics }
            | Self::Link(
                LinkError::UnresolvedSymbol { diagnostics, .. } | LinkError::Failed { diagnostics },
            ) => diagnostics.as_str(),
            _ => return None,
        };
        (!text.trim().is_empty()).then_some(text)
    }

    /// Short machine-readable kind, used in JSON reports
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "invalid_target",
            Self::SourceNotFound { .. } => "source_not_found",
            Self::TranslationError { .. } => "translation_error",
            Self::CompileError { .. } => "compile_error",
            Self::Link(LinkError::UnresolvedLibrary { .. }) => "unresolved_library",
            Self::Link(LinkError::UnresolvedSymbol { .. }) => "unresolved_symbol",
            Self::Link(LinkError::Failed { .. }) => "link_error",
            Self::Io { .. } => "io_error",
        }
    }
}
