//! Extension build orchestration
//!
//! Runs the per-target pipeline (validate, locate source, resolve libraries,
//! translate, compile, link, install) and fans independent targets out over a
//! rayon pool. Every target gets an outcome; one failure never stops the
//! others.

use super::bridge::{self, remove_if_exists};
use super::fingerprint;
use super::types::{BuildArtifact, BuildReport, TargetOutcome};
use crate::error::{BuildError, Stage};
use crate::paths::OutputLayout;
use crate::search_path::{LibrarySearchPath, LinkSpec};
use crate::target::ExtensionTarget;
use crate::toolchain::Toolchain;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Per-run build switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Worker threads; `None` uses rayon's default
    pub jobs: Option<usize>,
    /// Rebuild even when the stored fingerprint matches
    pub force: bool,
    /// Print each stage as it runs
    pub verbose: bool,
}

/// Builds extension targets against one toolchain and search path
#[derive(Debug)]
pub struct ExtensionBuilder {
    toolchain: Toolchain,
    search_path: LibrarySearchPath,
    layout: OutputLayout,
    options: BuildOptions,
}

impl ExtensionBuilder {
    pub fn new(
        toolchain: Toolchain,
        search_path: LibrarySearchPath,
        out_dir: impl Into<PathBuf>,
        options: BuildOptions,
    ) -> Self {
        let layout = OutputLayout::new(out_dir, toolchain.extension_suffix.clone());
        Self {
            toolchain,
            search_path,
            layout,
            options,
        }
    }

    pub const fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub const fn search_path(&self) -> &LibrarySearchPath {
        &self.search_path
    }

    pub const fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Validate a target, locate its source and resolve its libraries
    /// without running any tool.
    pub fn check_target(&self, target: &ExtensionTarget) -> Result<LinkSpec, BuildError> {
        self.prepare(target).map(|(_, _, spec)| spec)
    }

    /// Build one target.
    ///
    /// On failure the target's artifact and fingerprint from any earlier run
    /// are removed, so the output directory never holds a stale artifact for
    /// a target that just failed.
    pub fn build_target(&self, target: &ExtensionTarget) -> Result<BuildArtifact, BuildError> {
        let result = self.run_pipeline(target);

        if let Err(err) = &result
            && err.stage() != Stage::Validate
        {
            self.discard_outputs(&target.name);
        }

        result
    }

    /// Build every target, reporting outcomes in the order given.
    pub fn build_all(&self, targets: &[ExtensionTarget]) -> BuildReport {
        self.build_all_with(targets, |_| {})
    }

    /// Build every target, calling `on_done` as each one finishes.
    ///
    /// `on_done` runs on worker threads in completion order; the report is
    /// still in target order. A name repeated within `targets` fails at the
    /// validate stage after its first occurrence, since both would share one
    /// work dir and artifact.
    pub fn build_all_with<F>(&self, targets: &[ExtensionTarget], on_done: F) -> BuildReport
    where
        F: Fn(&TargetOutcome) + Sync,
    {
        let start = Instant::now();

        let mut seen = HashSet::new();
        let repeated: Vec<bool> = targets
            .iter()
            .map(|target| !seen.insert(target.name.as_str()))
            .collect();

        let run = || {
            targets
                .par_iter()
                .zip(&repeated)
                .map(|(target, &is_repeat)| {
                    let outcome = if is_repeat {
                        duplicate_outcome(target)
                    } else {
                        self.build_one(target)
                    };
                    on_done(&outcome);
                    outcome
                })
                .collect::<Vec<_>>()
        };

        let outcomes = match self.options.jobs {
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    crate::debug!("failed to create {jobs}-thread pool, using default: {e}");
                    run()
                }
            },
            None => run(),
        };

        BuildReport {
            outcomes,
            duration: start.elapsed(),
        }
    }

    fn build_one(&self, target: &ExtensionTarget) -> TargetOutcome {
        let start = Instant::now();
        let result = self.build_target(target);
        TargetOutcome {
            target: target.name.clone(),
            duration: start.elapsed(),
            result,
        }
    }

    /// Steps that run before any external tool.
    fn prepare(
        &self,
        target: &ExtensionTarget,
    ) -> Result<(ExtensionTarget, PathBuf, LinkSpec), BuildError> {
        target
            .validate()
            .map_err(|e| BuildError::InvalidTarget {
                target: target.name.clone(),
                reason: e.to_string(),
            })?;

        let target = target.to_absolute();
        let source = locate_source(&target.source_path)?;
        let link_spec = self.search_path.resolve(&target)?;

        Ok((target, source, link_spec))
    }

    fn run_pipeline(&self, target: &ExtensionTarget) -> Result<BuildArtifact, BuildError> {
        let (target, source, link_spec) = self.prepare(target)?;
        let name = target.name.as_str();

        let fingerprint = fingerprint::compute(&target, &source, &link_spec, &self.toolchain)?;
        let artifact_path = self.layout.artifact_path(name);
        let fingerprint_path = self.layout.fingerprint_path(name);

        if !self.options.force
            && artifact_path.is_file()
            && fingerprint::load(&fingerprint_path).as_deref() == Some(fingerprint.as_str())
        {
            crate::debug!("{name}: up to date ({fingerprint})");
            return artifact(name, artifact_path, fingerprint, true);
        }

        let work_dir = self.layout.work_dir(name);
        fs::create_dir_all(&work_dir).map_err(|e| BuildError::io(Stage::Translate, &work_dir, e))?;

        self.step(name, Stage::Translate);
        let unit = bridge::translate(&self.toolchain, &target, &source, &work_dir)?;

        self.step(name, Stage::Compile);
        let object = bridge::compile(&self.toolchain, &target, &unit, &work_dir)?;

        self.step(name, Stage::Link);
        let output_name = self.layout.artifact_file_name(name);
        bridge::link(
            &self.toolchain,
            &target,
            &link_spec,
            &object,
            &output_name,
            &work_dir,
        )?;

        self.step(name, Stage::Install);
        install(&work_dir.join(&output_name), &artifact_path)?;
        fingerprint::store(&fingerprint_path, &fingerprint)
            .map_err(|e| BuildError::io(Stage::Install, &fingerprint_path, e))?;

        artifact(name, artifact_path, fingerprint, false)
    }

    fn step(&self, target: &str, stage: Stage) {
        if self.options.verbose {
            println!("  {target}: {stage}");
        }
    }

    fn discard_outputs(&self, target: &str) {
        for path in [
            self.layout.artifact_path(target),
            self.layout.fingerprint_path(target),
        ] {
            if let Err(e) = remove_if_exists(&path) {
                crate::debug!("failed to remove {}: {e}", path.display());
            }
        }
    }
}

fn duplicate_outcome(target: &ExtensionTarget) -> TargetOutcome {
    TargetOutcome {
        target: target.name.clone(),
        duration: Duration::ZERO,
        result: Err(BuildError::InvalidTarget {
            target: target.name.clone(),
            reason: "duplicate target name in this build".to_string(),
        }),
    }
}

/// The source must be an existing regular file.
fn locate_source(path: &Path) -> Result<PathBuf, BuildError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(path.to_path_buf()),
        Ok(_) => Err(BuildError::source_not_found(path)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BuildError::source_not_found(path)),
        Err(e) => Err(BuildError::io(Stage::Source, path, e)),
    }
}

/// Move the linked module into the output directory, replacing any older one.
fn install(built: &Path, destination: &Path) -> Result<(), BuildError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(Stage::Install, parent, e))?;
    }
    fs::rename(built, destination).map_err(|e| BuildError::io(Stage::Install, destination, e))
}

fn artifact(
    target: &str,
    path: PathBuf,
    fingerprint: String,
    fresh: bool,
) -> Result<BuildArtifact, BuildError> {
    let size = fs::metadata(&path)
        .map_err(|e| BuildError::io(Stage::Install, &path, e))?
        .len();
    Ok(BuildArtifact {
        target: target.to_string(),
        path,
        size,
        fingerprint,
        fresh,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::search_path::SearchOrigin;
    use crate::target::LibraryName;
    use crate::test_utils::{BuildFixture, has_c_compiler};

    fn lib(name: &str) -> LibraryName {
        LibraryName::new(name).unwrap()
    }

    #[test]
    fn missing_source_fails_before_tools() {
        let fixture = BuildFixture::new();
        let builder = fixture.builder(BuildOptions::default());
        let target = ExtensionTarget::new("pkgcraft", fixture.path("src/missing.bridge"));

        let err = builder.build_target(&target).unwrap_err();
        assert!(matches!(err, BuildError::SourceNotFound { .. }));
        assert!(!fixture.work_dir("pkgcraft").exists());
    }

    #[test]
    fn directory_source_is_not_found() {
        let fixture = BuildFixture::new();
        fs::create_dir_all(fixture.path("src/pkgcraft.bridge")).unwrap();
        let builder = fixture.builder(BuildOptions::default());
        let target = ExtensionTarget::new("pkgcraft", fixture.path("src/pkgcraft.bridge"));

        let err = builder.build_target(&target).unwrap_err();
        assert_eq!(err.stage(), Stage::Source);
    }

    #[test]
    fn unresolved_library_fails_before_tools() {
        let fixture = BuildFixture::new();
        let source = fixture.write_source("pkgcraft", "int x;\n");
        let builder = fixture.builder(BuildOptions::default());
        let target = ExtensionTarget::new("pkgcraft", source)
            .with_link_libraries([lib("pkgcraft_missing_lib")]);

        match builder.build_target(&target).unwrap_err() {
            BuildError::Link(LinkError::UnresolvedLibrary { name, searched }) => {
                assert_eq!(name, "pkgcraft_missing_lib");
                assert!(searched.contains(&fixture.lib_dir()));
            }
            other => panic!("expected unresolved library, got {other:?}"),
        }
        assert!(!fixture.work_dir("pkgcraft").exists());
    }

    #[test]
    fn invalid_target_keeps_foreign_files() {
        let fixture = BuildFixture::new();
        let outside = fixture.path("escape.so");
        fs::write(&outside, "not ours").unwrap();

        let builder = fixture.builder(BuildOptions::default());
        let target = ExtensionTarget::new("../escape", fixture.path("a.bridge"));

        let err = builder.build_target(&target).unwrap_err();
        assert!(matches!(err, BuildError::InvalidTarget { .. }));
        assert!(outside.exists());
    }

    #[test]
    fn check_resolves_without_running_tools() {
        let fixture = BuildFixture::new();
        let source = fixture.write_source("pkgcraft", "int x;\n");
        fixture.touch_library("pkgcraft");

        let builder = fixture.builder(BuildOptions::default());
        let target =
            ExtensionTarget::new("pkgcraft", source).with_link_libraries([lib("pkgcraft")]);

        let spec = builder.check_target(&target).unwrap();
        assert_eq!(spec.libraries.len(), 1);
        assert_eq!(spec.libraries[0].origin, SearchOrigin::Config);
        assert!(!fixture.work_dir("pkgcraft").exists());
    }

    #[test]
    fn builds_and_reuses_artifact() {
        if !has_c_compiler() {
            return;
        }
        let fixture = BuildFixture::new();
        let source = fixture.write_source("pkgcraft", "int pkgcraft_bridge(void) { return 1; }\n");
        let builder = fixture.builder(BuildOptions::default());
        let target = ExtensionTarget::new("pkgcraft", source);

        let first = builder.build_target(&target).unwrap();
        assert!(!first.fresh);
        assert_eq!(first.path, builder.layout().artifact_path("pkgcraft"));
        let bytes = fs::read(&first.path).unwrap();

        let second = builder.build_target(&target).unwrap();
        assert!(second.fresh);
        assert_eq!(second.fingerprint, first.fingerprint);

        let forced = fixture.builder(BuildOptions {
            force: true,
            ..BuildOptions::default()
        });
        let third = forced.build_target(&target).unwrap();
        assert!(!third.fresh);
        assert_eq!(fs::read(&third.path).unwrap(), bytes);
    }

    #[test]
    fn failed_rebuild_removes_stale_artifact() {
        if !has_c_compiler() {
            return;
        }
        let fixture = BuildFixture::new();
        let source = fixture.write_source("pkgcraft", "int pkgcraft_bridge(void) { return 1; }\n");
        let builder = fixture.builder(BuildOptions::default());
        let target = ExtensionTarget::new("pkgcraft", &source);

        let artifact = builder.build_target(&target).unwrap();
        assert!(artifact.path.exists());

        fs::write(&source, "int pkgcraft_bridge(void) { return }\n").unwrap();
        let err = builder.build_target(&target).unwrap_err();
        assert_eq!(err.stage(), Stage::Compile);
        assert!(err.diagnostics().is_some());
        assert!(!artifact.path.exists());
        assert!(!builder.layout().fingerprint_path("pkgcraft").exists());
    }

    #[test]
    fn repeated_name_fails_without_building_twice() {
        let fixture = BuildFixture::new();
        let builder = fixture.builder(BuildOptions {
            jobs: Some(2),
            ..BuildOptions::default()
        });
        let targets = vec![
            ExtensionTarget::new("pkgcraft", fixture.path("src/missing.bridge")),
            ExtensionTarget::new("pkgcraft", fixture.path("src/other.bridge")),
        ];

        let report = builder.build_all(&targets);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].error().unwrap().stage(), Stage::Source);
        match report.outcomes[1].error().unwrap() {
            BuildError::InvalidTarget { target, reason } => {
                assert_eq!(target, "pkgcraft");
                assert!(reason.contains("duplicate"));
            }
            other => panic!("expected invalid target, got {other:?}"),
        }
    }

    #[test]
    fn batch_collects_every_outcome_in_order() {
        let fixture = BuildFixture::new();
        let present = fixture.write_source("present", "int x;\n");
        let builder = fixture.builder(BuildOptions {
            jobs: Some(2),
            ..BuildOptions::default()
        });

        let targets = vec![
            ExtensionTarget::new("missing", fixture.path("src/missing.bridge")),
            ExtensionTarget::new("present", present)
                .with_link_libraries([lib("pkgcraft_missing_lib")]),
        ];

        let seen = std::sync::Mutex::new(Vec::new());
        let report = builder.build_all_with(&targets, |outcome| {
            seen.lock().unwrap().push(outcome.target.clone());
        });

        let names: Vec<_> = report.outcomes.iter().map(|o| o.target.as_str()).collect();
        assert_eq!(names, vec!["missing", "present"]);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.outcomes[0].error().unwrap().stage(), Stage::Source);
        assert_eq!(report.outcomes[1].error().unwrap().stage(), Stage::Link);
    }
}
