//! Build command
//!
//! Build every (or the selected) extension target and report per-target
//! results. Exits non-zero if any target fails.

use super::{Project, ProjectArgs, display_path, format_bytes};
use anyhow::{Context, Result};
use bridgebuild::{BuildError, LinkError, TargetOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::env;

/// Output switches for `build`
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BuildFlags {
    pub(crate) force: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
    pub(crate) json: bool,
}

/// Build extension targets
pub(crate) fn run(args: &ProjectArgs, names: &[String], flags: BuildFlags) -> Result<()> {
    let project = Project::load(args)?;
    let targets = project.targets(names)?;

    // JSON goes to stdout, so nothing else may
    let verbose = flags.verbose && !flags.json;
    let chatty = !flags.quiet && !flags.json;

    let builder = project.builder(flags.force, verbose);

    if chatty {
        println!(
            "Building {} extension(s) into {}",
            targets.len(),
            project.out_dir.display()
        );
    }

    let pb = if chatty && !verbose {
        let pb = ProgressBar::new(targets.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let report = builder.build_all_with(&targets, |outcome| {
        pb.set_message(outcome.target.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();

    let cwd = env::current_dir().unwrap_or_default();

    if flags.json {
        let json = serde_json::to_string_pretty(&report.to_json())
            .context("Failed to serialize build report")?;
        println!("{json}");
    } else if chatty {
        for outcome in &report.outcomes {
            match &outcome.result {
                Ok(artifact) if artifact.fresh => println!(
                    "  FRESH {} -> {}",
                    outcome.target,
                    display_path(&artifact.path, &cwd)
                ),
                Ok(artifact) => println!(
                    "  OK {} -> {} ({}, {:.2}s)",
                    outcome.target,
                    display_path(&artifact.path, &cwd),
                    format_bytes(artifact.size),
                    outcome.duration.as_secs_f64()
                ),
                Err(err) => println!("  FAIL {} ({} stage)", outcome.target, err.stage()),
            }
        }
    }

    for outcome in report.failures() {
        report_failure(outcome);
    }

    let (built, fresh, failed) = report.summarize();
    if chatty {
        println!();
        println!(
            "{built} built, {fresh} fresh, {failed} failed in {:.2}s",
            report.duration.as_secs_f64()
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} target(s) failed", report.outcomes.len());
    }

    Ok(())
}

/// Print a failed target's stage, error and the tool's raw output to stderr.
fn report_failure(outcome: &TargetOutcome) {
    let Some(err) = outcome.error() else {
        return;
    };

    eprintln!(
        "error: target '{}' failed at {} stage: {err}",
        outcome.target,
        err.stage()
    );

    match err {
        BuildError::Link(LinkError::UnresolvedLibrary { searched, .. }) if !searched.is_empty() => {
            eprintln!("  searched:");
            for dir in searched {
                eprintln!("    {}", dir.display());
            }
        }
        BuildError::Io { source, .. } => eprintln!("  {source}"),
        _ => {}
    }

    if let Some(diagnostics) = err.diagnostics() {
        eprint!("{diagnostics}");
        if !diagnostics.ends_with('\n') {
            eprintln!();
        }
    }
}
