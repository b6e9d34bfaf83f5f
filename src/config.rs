//! User configuration file
//!
//! Optional per-user defaults read from
//! `$XDG_CONFIG_HOME/bridgebuild/config.toml` (or `~/.config/bridgebuild/`).
//! Anything set here is overridden by the build descriptor, the environment
//! and command-line flags.

use crate::toolchain::TranslatorSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// User-level defaults loaded from TOML
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// C compiler, e.g. `"ccache gcc"`
    #[serde(default)]
    pub cc: Option<String>,

    /// C++ compiler
    #[serde(default)]
    pub cxx: Option<String>,

    /// Default number of parallel jobs
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Default output directory
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    /// Translator used when the descriptor has no `[translator]` table
    #[serde(default)]
    pub translator: Option<TranslatorSpec>,

    /// Extra library search directories, searched after `LIBRARY_PATH`
    #[serde(default)]
    pub library_dirs: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_with_options(None, false)
    }

    /// Load configuration with custom options.
    ///
    /// # Arguments
    /// * `custom_path` - Config file to read instead of the default; must exist
    /// * `skip_rc` - If true, skip loading config files (return default config)
    pub fn load_with_options(custom_path: Option<&Path>, skip_rc: bool) -> Result<Self> {
        if skip_rc || crate::env_vars::ignore_config() {
            return Ok(Self::default());
        }

        if let Some(path) = custom_path {
            return Self::load_from(path);
        }

        match Self::user_config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        crate::debug!("loaded config from {}", path.display());

        // Relative library dirs belong to the config file, not the build's cwd
        let base = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let base = std::path::absolute(base).unwrap_or_else(|_| base.to_path_buf());
        for dir in &mut config.library_dirs {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        Ok(config)
    }

    /// Path of the per-user config file, whether or not it exists.
    pub fn user_config_path() -> Option<PathBuf> {
        Self::user_config_dir().map(|dir| dir.join("config.toml"))
    }

    fn user_config_dir() -> Option<PathBuf> {
        // Check XDG_CONFIG_HOME first
        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME")
            && !xdg_config.is_empty()
        {
            return Some(PathBuf::from(xdg_config).join("bridgebuild"));
        }

        // Fall back to ~/.config/bridgebuild
        dirs::home_dir().map(|home| home.join(".config").join("bridgebuild"))
    }
}
