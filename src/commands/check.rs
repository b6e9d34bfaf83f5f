//! Check command
//!
//! Validate the build descriptor, locate every bridge source and resolve
//! every library, without translating, compiling or linking anything.

use super::{Project, ProjectArgs};
use anyhow::Result;

/// Check that every selected target could be built
pub(crate) fn run(args: &ProjectArgs, names: &[String], quiet: bool) -> Result<()> {
    let project = Project::load(args)?;
    let targets = project.targets(names)?;
    let builder = project.builder(false, false);

    let mut failed = 0;
    for target in &targets {
        match builder.check_target(target) {
            Ok(spec) => {
                if quiet {
                    continue;
                }
                println!("  OK {}", target.name);
                for library in &spec.libraries {
                    println!(
                        "     -l{} -> {} ({})",
                        library.name,
                        library.path.display(),
                        library.origin
                    );
                }
            }
            Err(err) => {
                failed += 1;
                eprintln!(
                    "error: target '{}' failed at {} stage: {err}",
                    target.name,
                    err.stage()
                );
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} target(s) cannot be built", targets.len());
    }

    if !quiet {
        println!();
        println!(
            "All {} target(s) in {} are ready to build",
            targets.len(),
            project.descriptor.path.display()
        );
    }

    Ok(())
}
