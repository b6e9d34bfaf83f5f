//! Build outcome types
//!
//! A build run produces one [`TargetOutcome`] per requested target, collected
//! into a [`BuildReport`]. Failures are kept alongside successes so the whole
//! run can be reported at the end.

use crate::error::{BuildError, LinkError};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;

/// A loadable extension written to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
    /// Target the artifact was built from
    pub target: String,
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 over the inputs that produced the artifact
    pub fingerprint: String,
    /// True if the artifact was reused from a previous build
    pub fresh: bool,
}

/// Result of building one target
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: String,
    pub duration: Duration,
    pub result: Result<BuildArtifact, BuildError>,
}

impl TargetOutcome {
    pub const fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn artifact(&self) -> Option<&BuildArtifact> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&BuildError> {
        self.result.as_ref().err()
    }

    fn to_json(&self) -> Value {
        let mut entry = json!({
            "name": self.target,
            "status": match &self.result {
                Ok(artifact) if artifact.fresh => "fresh",
                Ok(_) => "built",
                Err(_) => "failed",
            },
            "duration_ms": duration_ms(self.duration),
        });

        match &self.result {
            Ok(artifact) => {
                entry["artifact"] = json!({
                    "path": artifact.path.display().to_string(),
                    "size": artifact.size,
                    "fingerprint": artifact.fingerprint,
                });
            }
            Err(err) => {
                let mut error = json!({
                    "stage": err.stage(),
                    "kind": err.kind(),
                    "message": err.to_string(),
                });
                match err {
                    BuildError::Link(LinkError::UnresolvedLibrary { name, .. }) => {
                        error["library"] = json!(name);
                    }
                    BuildError::Link(LinkError::UnresolvedSymbol { symbol, .. }) => {
                        error["symbol"] = json!(symbol);
                    }
                    _ => {}
                }
                if let Some(diagnostics) = err.diagnostics() {
                    error["diagnostics"] = json!(diagnostics);
                }
                entry["error"] = error;
            }
        }

        entry
    }
}

/// Aggregated result of a build run, in target declaration order
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<TargetOutcome>,
    pub duration: Duration,
}

impl BuildReport {
    /// True if every requested target produced an artifact
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TargetOutcome::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &BuildArtifact> {
        self.outcomes.iter().filter_map(TargetOutcome::artifact)
    }

    /// Count of (rebuilt, fresh, failed) targets
    pub fn summarize(&self) -> (usize, usize, usize) {
        let fresh = self.artifacts().filter(|a| a.fresh).count();
        let built = self.artifacts().count() - fresh;
        let failed = self.failures().count();
        (built, fresh, failed)
    }

    /// JSON form printed by `build --json`
    pub fn to_json(&self) -> Value {
        let (built, fresh, failed) = self.summarize();
        json!({
            "success": self.is_success(),
            "built": built,
            "fresh": fresh,
            "failed": failed,
            "duration_ms": duration_ms(self.duration),
            "targets": self.outcomes.iter().map(TargetOutcome::to_json).collect::<Vec<_>>(),
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
