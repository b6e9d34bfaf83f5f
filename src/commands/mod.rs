//! Subcommand implementations
//!
//! Every command that reads a project goes through [`Project::load`], which
//! layers settings as: command line > environment > build descriptor > user
//! config > defaults.

pub(crate) mod build;
pub(crate) mod check;
pub(crate) mod clean;
pub(crate) mod completion;
pub(crate) mod env;
pub(crate) mod init;

use anyhow::{Context, Result};
use bridgebuild::{
    BuildDescriptor, BuildOptions, Config, ExtensionBuilder, ExtensionTarget, HostEnvironment,
    LibrarySearchPath, Toolchain, env_vars, find_descriptor, find_descriptor_in,
};
use std::path::{Path, PathBuf};

/// Options shared by commands that operate on a build descriptor
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct ProjectArgs {
    /// Path to the build descriptor (or a directory containing bridgebuild.toml)
    #[arg(long, short = 'm', value_name = "PATH")]
    pub(crate) manifest: Option<PathBuf>,

    /// Directory to write artifacts into
    #[arg(long, short = 'o', value_name = "DIR")]
    pub(crate) out_dir: Option<PathBuf>,

    /// Number of targets to build in parallel
    #[arg(long, short = 'j')]
    pub(crate) jobs: Option<usize>,

    /// Read user configuration from this file instead of the default location
    #[arg(long, value_name = "PATH", conflicts_with = "no_config")]
    pub(crate) config: Option<PathBuf>,

    /// Ignore the user configuration file
    #[arg(long)]
    pub(crate) no_config: bool,
}

impl ProjectArgs {
    pub(crate) fn descriptor_path(&self) -> PathBuf {
        self.manifest
            .as_ref()
            .map_or_else(find_descriptor, find_descriptor_in)
    }

    pub(crate) fn load_config(&self) -> Result<Config> {
        Config::load_with_options(self.config.as_deref(), self.no_config)
    }
}

/// A loaded project: descriptor plus every setting that applies to it
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) descriptor: BuildDescriptor,
    pub(crate) config: Config,
    pub(crate) host: HostEnvironment,
    pub(crate) toolchain: Toolchain,
    pub(crate) out_dir: PathBuf,
    pub(crate) jobs: Option<usize>,
}

impl Project {
    pub(crate) fn load(args: &ProjectArgs) -> Result<Self> {
        let config = args.load_config()?;

        let path = args.descriptor_path();
        let descriptor = BuildDescriptor::from_file(&path)
            .with_context(|| format!("Failed to load build descriptor {}", path.display()))?;
        bridgebuild::debug!(
            "loaded {} target(s) from {}",
            descriptor.targets.len(),
            path.display()
        );

        let host = HostEnvironment::capture();
        let toolchain = Toolchain::resolve(
            &host,
            &descriptor.settings,
            descriptor.translator.as_ref(),
            &config,
        );

        let out_dir = args
            .out_dir
            .clone()
            .or_else(|| env_vars::out_dir().map(PathBuf::from))
            .or_else(|| descriptor.settings.out_dir.clone())
            .or_else(|| config.out_dir.clone())
            .unwrap_or_else(|| descriptor.default_out_dir());

        let jobs = args
            .jobs
            .or_else(env_vars::jobs)
            .or(descriptor.settings.jobs)
            .or(config.jobs);
        if jobs == Some(0) {
            anyhow::bail!("jobs must be at least 1");
        }

        Ok(Self {
            descriptor,
            config,
            host,
            toolchain,
            out_dir,
            jobs,
        })
    }

    /// Targets named on the command line, or all of them.
    pub(crate) fn targets(&self, names: &[String]) -> Result<Vec<ExtensionTarget>> {
        Ok(self.descriptor.select(names)?)
    }

    pub(crate) fn search_path(&self) -> LibrarySearchPath {
        discover_search_path(&self.host, &self.config, &self.toolchain)
    }

    pub(crate) fn builder(&self, force: bool, verbose: bool) -> ExtensionBuilder {
        ExtensionBuilder::new(
            self.toolchain.clone(),
            self.search_path(),
            &self.out_dir,
            BuildOptions {
                jobs: self.jobs,
                force,
                verbose,
            },
        )
    }
}

pub(crate) fn discover_search_path(
    host: &HostEnvironment,
    config: &Config,
    toolchain: &Toolchain,
) -> LibrarySearchPath {
    LibrarySearchPath::discover(
        host,
        &config.library_dirs,
        toolchain.query_library_dirs().as_deref(),
    )
}

/// Format bytes into a human-readable string
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS.get(unit).copied().unwrap_or("B"))
}

/// Display a path relative to `base` when it lies inside it.
pub(crate) fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
