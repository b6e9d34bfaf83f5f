//! Translate, compile and link stages
//!
//! Each stage runs one external tool inside the target's work directory,
//! using relative file names for everything it creates so repeated builds
//! see identical command lines. The tool's exit status decides success; its
//! output is carried verbatim in the error.

use crate::diagnostics;
use crate::error::{BuildError, LinkError, Stage};
use crate::search_path::LinkSpec;
use crate::target::ExtensionTarget;
use crate::toolchain::{Toolchain, run_tool};
use std::fs;
use std::io;
use std::path::Path;

const OBJECT_EXTENSION: &str = if cfg!(windows) { "obj" } else { "o" };

/// Run the translator on `source`, writing `<name>.<ext>` into `work_dir`.
///
/// Returns the unit's file name relative to `work_dir`.
pub fn translate(
    toolchain: &Toolchain,
    target: &ExtensionTarget,
    source: &Path,
    work_dir: &Path,
) -> Result<String, BuildError> {
    let translator = &toolchain.translator;
    let unit_name = format!("{}.{}", target.name, translator.output_extension);
    let unit = work_dir.join(&unit_name);

    // A unit left over from an earlier run must not pass for fresh output
    remove_if_exists(&unit).map_err(|e| BuildError::io(Stage::Translate, &unit, e))?;

    let mut cmd = translator.command(source, Path::new(&unit_name));
    cmd.current_dir(work_dir);

    let output = run_tool(&mut cmd).map_err(|e| {
        BuildError::translation(format!("failed to run {}: {e}", translator.program))
    })?;
    if !output.success {
        return Err(BuildError::translation(
            output.diagnostics_or_status(&translator.program),
        ));
    }
    if !unit.is_file() {
        return Err(BuildError::translation(format!(
            "{} exited successfully but did not write {unit_name}\n{}",
            translator.program, output.diagnostics
        )));
    }

    Ok(unit_name)
}

/// Compile a unit in `work_dir` to an object file; returns the object's name.
pub fn compile(
    toolchain: &Toolchain,
    target: &ExtensionTarget,
    unit_name: &str,
    work_dir: &Path,
) -> Result<String, BuildError> {
    let language = toolchain.translator.language();
    let compiler = toolchain.compiler_for(language);
    let object_name = format!("{}.{OBJECT_EXTENSION}", target.name);

    let mut cmd = compiler.command();
    cmd.current_dir(work_dir);
    cmd.args(toolchain.compile_flags_for(language));
    if !cfg!(windows) {
        cmd.arg("-fPIC");
    }
    for dir in &target.options.include_dirs {
        cmd.arg(format!("-I{}", dir.display()));
    }
    for define in &target.options.defines {
        cmd.arg(format!("-D{define}"));
    }
    cmd.args(&target.options.extra_compile_args);
    cmd.args(["-c", unit_name, "-o", &object_name]);

    let output = run_tool(&mut cmd)
        .map_err(|e| BuildError::compile(format!("failed to run {compiler}: {e}")))?;
    if !output.success {
        return Err(BuildError::compile(
            output.diagnostics_or_status(&compiler.program),
        ));
    }

    Ok(object_name)
}

/// Link an object into a loadable module named `output_name` in `work_dir`.
pub fn link(
    toolchain: &Toolchain,
    target: &ExtensionTarget,
    link_spec: &LinkSpec,
    object_name: &str,
    output_name: &str,
    work_dir: &Path,
) -> Result<(), BuildError> {
    let linker = toolchain.linker();

    let mut cmd = linker.command();
    cmd.current_dir(work_dir);
    cmd.arg("-shared");
    cmd.args(&toolchain.ldflags);
    cmd.args([object_name, "-o", output_name]);
    cmd.args(link_spec.link_args());
    if !cfg!(windows) {
        for dir in &target.options.runtime_library_dirs {
            cmd.arg(format!("-Wl,-rpath,{}", dir.display()));
        }
    }
    cmd.args(&target.options.extra_link_args);
    cmd.args(toolchain.undefined_symbol_flags());

    let output = run_tool(&mut cmd).map_err(|e| LinkError::Failed {
        diagnostics: format!("failed to run {linker}: {e}"),
    })?;
    if !output.success {
        return Err(classify_link_failure(output.diagnostics_or_status(&linker.program)).into());
    }

    Ok(())
}

/// Turn linker output into the most specific [`LinkError`].
pub fn classify_link_failure(diagnostics: String) -> LinkError {
    if let Some(name) = diagnostics::missing_library(&diagnostics) {
        return LinkError::unresolved_library(name, Vec::new());
    }
    if let Some(symbol) = diagnostics::unresolved_symbols(&diagnostics).into_iter().next() {
        return LinkError::UnresolvedSymbol {
            symbol,
            diagnostics,
        };
    }
    LinkError::Failed { diagnostics }
}

pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use crate::test_utils::copy_toolchain;
    use crate::toolchain::TranslatorSpec;
    use tempfile::TempDir;

    #[test]
    fn classify_missing_library() {
        let err = classify_link_failure("/usr/bin/ld: cannot find -lpkgcraft".to_string());
        assert!(matches!(err, LinkError::UnresolvedLibrary { name, .. } if name == "pkgcraft"));
    }

    #[test]
    fn classify_missing_symbol() {
        let diagnostics = "pkgcraft.c:(.text+0x5): undefined reference to `pkgcraft_version'\n";
        match classify_link_failure(diagnostics.to_string()) {
            LinkError::UnresolvedSymbol {
                symbol,
                diagnostics: text,
            } => {
                assert_eq!(symbol, "pkgcraft_version");
                assert_eq!(text, diagnostics);
            }
            other => panic!("expected unresolved symbol, got {other:?}"),
        }
    }

    #[test]
    fn classify_other_failure() {
        let err = classify_link_failure("ld: file format not recognized".to_string());
        assert!(matches!(err, LinkError::Failed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn translate_writes_unit_in_work_dir() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("pkgcraft.bridge");
        fs::write(&source, "int pkgcraft_bridge(void) { return 0; }\n").unwrap();
        let work_dir = temp.path().join("work");
        fs::create_dir_all(&work_dir).unwrap();

        let target = ExtensionTarget::new("pkgcraft", &source);
        let unit = translate(&copy_toolchain(), &target, &source, &work_dir).unwrap();

        assert_eq!(unit, "pkgcraft.c");
        assert_eq!(
            fs::read_to_string(work_dir.join(unit)).unwrap(),
            "int pkgcraft_bridge(void) { return 0; }\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn translator_failure_carries_output() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("pkgcraft.bridge");
        fs::write(&source, "").unwrap();

        let toolchain = Toolchain {
            translator: TranslatorSpec {
                program: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    "echo 'pkgcraft.bridge:1:0: syntax error' >&2; exit 1".to_string(),
                ],
                output_extension: "c".to_string(),
            },
            ..Toolchain::default()
        };

        let target = ExtensionTarget::new("pkgcraft", &source);
        let err = translate(&toolchain, &target, &source, temp.path()).unwrap_err();
        assert_eq!(err.stage(), Stage::Translate);
        assert_eq!(err.diagnostics(), Some("pkgcraft.bridge:1:0: syntax error\n"));
    }

    #[cfg(unix)]
    #[test]
    fn translator_without_output_fails() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("pkgcraft.bridge");
        fs::write(&source, "").unwrap();

        let toolchain = Toolchain {
            translator: TranslatorSpec {
                program: "true".to_string(),
                args: Vec::new(),
                output_extension: "c".to_string(),
            },
            ..Toolchain::default()
        };

        let target = ExtensionTarget::new("pkgcraft", &source);
        let err = translate(&toolchain, &target, &source, temp.path()).unwrap_err();
        assert!(matches!(err, BuildError::TranslationError { .. }));
    }

    #[test]
    fn missing_translator_is_a_translation_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("pkgcraft.bridge");
        fs::write(&source, "").unwrap();

        let toolchain = Toolchain {
            translator: TranslatorSpec {
                program: "bridgebuild-no-such-translator".to_string(),
                ..TranslatorSpec::default()
            },
            ..Toolchain::default()
        };

        let target = ExtensionTarget::new("pkgcraft", &source);
        let err = translate(&toolchain, &target, &source, temp.path()).unwrap_err();
        assert_eq!(err.stage(), Stage::Translate);
        assert!(
            err.diagnostics()
                .unwrap()
                .starts_with("failed to run bridgebuild-no-such-translator")
        );
    }
}
