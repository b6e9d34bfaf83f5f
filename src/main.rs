//! bridgebuild command-line interface
//!
//! Builds loadable native extensions from bridge sources linked against
//! system libraries resolved by name.

use clap::{Parser, Subcommand};
use commands::ProjectArgs;
use commands::build::BuildFlags;
use commands::init::InitOptions;
use std::path::PathBuf;
use std::process;

/// Display an error with its chain of causes
fn display_error(err: &anyhow::Error) {
    eprintln!("error: {err}");

    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }
}

#[derive(Parser)]
#[command(name = "bridgebuild")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Build loadable native extensions from bridge sources",
    long_about = None
)]
pub(crate) struct Cli {
    /// Print debug information to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build extension targets from the build descriptor
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Build only this target (repeatable)
        #[arg(long = "target", short = 't', value_name = "NAME")]
        targets: Vec<String>,

        /// Rebuild even if inputs are unchanged
        #[arg(long)]
        force: bool,

        /// Print each build stage as it runs
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long, short, conflicts_with = "verbose")]
        quiet: bool,

        /// Print the build report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check that every target's source and libraries can be found
    Check {
        #[command(flatten)]
        project: ProjectArgs,

        /// Check only this target (repeatable)
        #[arg(long = "target", short = 't', value_name = "NAME")]
        targets: Vec<String>,

        /// Only report problems
        #[arg(long, short)]
        quiet: bool,
    },

    /// Remove built artifacts and intermediates
    Clean {
        #[command(flatten)]
        project: ProjectArgs,

        /// Clean only this target (repeatable)
        #[arg(long = "target", short = 't', value_name = "NAME")]
        targets: Vec<String>,

        /// Show what would be removed without removing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show toolchain, environment and library search path
    Env {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Create a starter build descriptor
    Init {
        /// Directory (or descriptor file) to create
        path: Option<PathBuf>,

        /// Target name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Bridge source path, relative to the descriptor
        #[arg(long)]
        source: Option<String>,

        /// Native library to link (repeatable)
        #[arg(long = "library", short = 'l', value_name = "NAME")]
        libraries: Vec<String>,

        /// Overwrite an existing descriptor
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    bridgebuild::init_debug(cli.debug);

    let result = match cli.command {
        Commands::Build {
            project,
            targets,
            force,
            verbose,
            quiet,
            json,
        } => commands::build::run(
            &project,
            &targets,
            BuildFlags {
                force,
                verbose,
                quiet,
                json,
            },
        ),
        Commands::Check {
            project,
            targets,
            quiet,
        } => commands::check::run(&project, &targets, quiet),
        Commands::Clean {
            project,
            targets,
            dry_run,
        } => commands::clean::run(&project, &targets, dry_run),
        Commands::Env { project } => commands::env::run(&project),
        Commands::Init {
            path,
            name,
            source,
            libraries,
            force,
        } => commands::init::run(
            path.as_deref(),
            &InitOptions {
                name,
                source,
                libraries,
                force,
            },
        ),
        Commands::Completion { shell } => commands::completion::run(shell),
    };

    if let Err(e) = result {
        bridgebuild::debug_log("command failed");
        display_error(&e);
        process::exit(1);
    }
}

mod commands;
