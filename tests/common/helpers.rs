//! Shared test helpers and utilities

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Path to the bridgebuild binary under test
pub(crate) fn get_bridgebuild_binary() -> String {
    env!("CARGO_BIN_EXE_bridgebuild").to_string()
}

/// Whether a working `cc` is on PATH. Tests that compile or link skip
/// themselves without one.
#[allow(dead_code)]
pub(crate) fn has_cc() -> bool {
    Command::new("cc")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// One `[[extension]]` entry
#[allow(dead_code)]
pub(crate) struct TargetDef<'a> {
    pub(crate) name: &'a str,
    pub(crate) source: &'a str,
    pub(crate) libraries: &'a [&'a str],
    pub(crate) library_dirs: &'a [&'a str],
    pub(crate) include_dirs: &'a [&'a str],
}

#[allow(dead_code)]
impl<'a> TargetDef<'a> {
    pub(crate) const fn new(name: &'a str, source: &'a str) -> Self {
        Self {
            name,
            source,
            libraries: &[],
            library_dirs: &[],
            include_dirs: &[],
        }
    }

    pub(crate) const fn linking(mut self, libraries: &'a [&'a str], dirs: &'a [&'a str]) -> Self {
        self.libraries = libraries;
        self.library_dirs = dirs;
        self
    }

    pub(crate) const fn including(mut self, dirs: &'a [&'a str]) -> Self {
        self.include_dirs = dirs;
        self
    }
}

fn toml_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write `bridgebuild.toml` whose translator copies the bridge source
/// through unchanged, so bridge files hold plain C.
#[allow(dead_code)]
pub(crate) fn write_descriptor(dir: &Path, targets: &[TargetDef<'_>]) -> PathBuf {
    write_descriptor_with_translator(dir, "cp", &["{source}", "{output}"], targets)
}

/// Write `bridgebuild.toml` with a custom translator command.
#[allow(dead_code)]
pub(crate) fn write_descriptor_with_translator(
    dir: &Path,
    program: &str,
    args: &[&str],
    targets: &[TargetDef<'_>],
) -> PathBuf {
    let mut content = String::from("[build]\nout_dir = \"build\"\n\n");
    writeln!(&mut content, "[translator]").unwrap();
    writeln!(&mut content, "program = \"{program}\"").unwrap();
    writeln!(&mut content, "args = [{}]", toml_list(args)).unwrap();
    writeln!(&mut content, "output_extension = \"c\"").unwrap();

    for target in targets {
        writeln!(&mut content, "\n[[extension]]").unwrap();
        writeln!(&mut content, "name = \"{}\"", target.name).unwrap();
        writeln!(&mut content, "source_path = \"{}\"", target.source).unwrap();
        writeln!(
            &mut content,
            "link_libraries = [{}]",
            toml_list(target.libraries)
        )
        .unwrap();
        if !target.library_dirs.is_empty() {
            writeln!(
                &mut content,
                "library_dirs = [{}]",
                toml_list(target.library_dirs)
            )
            .unwrap();
        }
        if !target.include_dirs.is_empty() {
            writeln!(
                &mut content,
                "include_dirs = [{}]",
                toml_list(target.include_dirs)
            )
            .unwrap();
        }
    }

    let path = dir.join("bridgebuild.toml");
    fs::write(&path, content).expect("Failed to write descriptor");
    path
}

/// Write a bridge source under `dir`, creating parent directories.
#[allow(dead_code)]
pub(crate) fn write_source(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().expect("source has a parent")).unwrap();
    fs::write(&path, content).expect("Failed to write bridge source");
    path
}

/// Build `lib<name>.so` in `lib_dir` from the given C code.
#[allow(dead_code)]
pub(crate) fn build_shared_library(lib_dir: &Path, name: &str, code: &str) -> PathBuf {
    fs::create_dir_all(lib_dir).unwrap();
    let c_file = lib_dir.join(format!("{name}.c"));
    fs::write(&c_file, code).unwrap();
    let lib = lib_dir.join(format!("lib{name}.so"));

    let status = Command::new("cc")
        .args(["-shared", "-fPIC", "-o"])
        .arg(&lib)
        .arg(&c_file)
        .status()
        .expect("Failed to run cc");
    assert!(status.success(), "building lib{name}.so failed");
    lib
}

/// Run bridgebuild in `dir` isolated from the caller's configuration and
/// toolchain environment.
#[allow(dead_code)]
pub(crate) fn run_in(dir: &TempDir, args: &[&str]) -> Output {
    run_in_with_env(dir, args, &[])
}

/// Like [`run_in`], with some variables set for the run.
#[allow(dead_code)]
pub(crate) fn run_in_with_env(dir: &TempDir, args: &[&str], vars: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(get_bridgebuild_binary());
    cmd.args(args)
        .arg("--no-config")
        .current_dir(dir.path())
        .env_remove("BRIDGEBUILD_MANIFEST")
        .env_remove("BRIDGEBUILD_OUT_DIR")
        .env_remove("BRIDGEBUILD_JOBS")
        .env_remove("BRIDGEBUILD_TRANSLATOR")
        .env_remove("CC")
        .env_remove("CFLAGS")
        .env_remove("LDFLAGS")
        .env_remove("LIBRARY_PATH");
    cmd.envs(vars.iter().copied());
    cmd.output().expect("Failed to execute bridgebuild")
}

/// Stdout and stderr of a finished run, lossily decoded
#[allow(dead_code)]
pub(crate) fn outputs(output: &Output) -> (String, String) {
    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}
