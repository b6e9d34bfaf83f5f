mod common;

use std::env::consts::DLL_SUFFIX;
use std::fs;
use tempfile::TempDir;

use common::helpers::{
    TargetDef, build_shared_library, has_cc, outputs, run_in, write_descriptor,
    write_descriptor_with_translator, write_source,
};

// ===== CHECK COMMAND TESTS =====

#[test]
fn check_resolves_libraries_without_translating() {
    if !has_cc() {
        return;
    }
    let temp = TempDir::new().unwrap();
    build_shared_library(
        &temp.path().join("lib"),
        "bbfake",
        "int bbfake_version(void) { return 1; }\n",
    );
    write_source(temp.path(), "src/pkgcraft.bridge", "int x;\n");
    // A translator that would fail if it ever ran
    write_descriptor_with_translator(
        temp.path(),
        "false",
        &[],
        &[TargetDef::new("pkgcraft", "src/pkgcraft.bridge").linking(&["bbfake"], &["lib"])],
    );

    let output = run_in(&temp, &["check"]);
    let (stdout, stderr) = outputs(&output);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("OK pkgcraft"), "stdout: {stdout}");
    assert!(stdout.contains("-lbbfake ->"), "stdout: {stdout}");
    assert!(stdout.contains("libbbfake.so"), "stdout: {stdout}");
    assert!(stdout.contains("(target)"), "stdout: {stdout}");
    assert!(!temp.path().join("build").exists());
}

#[test]
fn check_reports_every_problem() {
    let temp = TempDir::new().unwrap();
    write_source(temp.path(), "src/linked.bridge", "int x;\n");
    write_descriptor(
        temp.path(),
        &[
            TargetDef::new("absent", "src/absent.bridge"),
            TargetDef::new("linked", "src/linked.bridge")
                .linking(&["bridgebuild_no_such_library"], &[]),
        ],
    );

    let output = run_in(&temp, &["check", "--quiet"]);
    let (stdout, stderr) = outputs(&output);
    assert!(!output.status.success());
    assert!(stdout.is_empty(), "quiet check printed: {stdout}");
    assert!(
        stderr.contains("target 'absent' failed at source stage"),
        "stderr: {stderr}"
    );
    assert!(
        stderr.contains("target 'linked' failed at link stage"),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("2 of 2 target(s) cannot be built"), "stderr: {stderr}");
}

#[test]
fn check_rejects_invalid_descriptor() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("bridgebuild.toml"),
        "[[extension]]\nname = \"pkgcraft\"\nsource_path = \"a.bridge\"\nlink_libraries = [\"libpkgcraft.so\"]\n",
    )
    .unwrap();

    let output = run_in(&temp, &["check"]);
    let (_, stderr) = outputs(&output);
    assert!(!output.status.success());
    assert!(stderr.contains("invalid library name"), "stderr: {stderr}");
}

#[test]
fn check_with_manifest_directory() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    write_source(&project, "src/plain.bridge", "int x;\n");
    write_descriptor(&project, &[TargetDef::new("plain", "src/plain.bridge")]);

    let output = run_in(&temp, &["check", "--manifest", project.to_str().unwrap()]);
    let (stdout, stderr) = outputs(&output);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("All 1 target(s)"), "stdout: {stdout}");
}

// ===== CLEAN COMMAND TESTS =====

/// Lay out the outputs a previous build would have left behind.
fn built_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_source(temp.path(), "src/pkgcraft.bridge", "int x;\n");
    write_source(temp.path(), "src/other.bridge", "int y;\n");
    write_descriptor(
        temp.path(),
        &[
            TargetDef::new("pkgcraft", "src/pkgcraft.bridge"),
            TargetDef::new("other", "src/other.bridge"),
        ],
    );

    let build = temp.path().join("build");
    fs::create_dir_all(build.join(".bridgebuild/pkgcraft")).unwrap();
    fs::create_dir_all(build.join(".bridgebuild/other")).unwrap();
    fs::write(build.join(format!("pkgcraft{DLL_SUFFIX}")), vec![0u8; 64]).unwrap();
    fs::write(build.join(format!("other{DLL_SUFFIX}")), vec![0u8; 32]).unwrap();
    fs::write(build.join(".bridgebuild/pkgcraft/pkgcraft.c"), "int x;\n").unwrap();
    fs::write(build.join(".bridgebuild/pkgcraft/.fingerprint"), "abc\n").unwrap();
    fs::write(build.join(".bridgebuild/other/.fingerprint"), "def\n").unwrap();
    fs::write(build.join("README"), "not ours\n").unwrap();
    temp
}

#[test]
fn clean_dry_run_removes_nothing() {
    let temp = built_project();

    let output = run_in(&temp, &["clean", "--dry-run"]);
    let (stdout, stderr) = outputs(&output);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("Would remove"), "stdout: {stdout}");
    assert!(temp.path().join("build").join(format!("pkgcraft{DLL_SUFFIX}")).exists());
    assert!(temp.path().join("build/.bridgebuild").exists());
}

#[test]
fn clean_removes_outputs_only() {
    let temp = built_project();

    let output = run_in(&temp, &["clean"]);
    let (_, stderr) = outputs(&output);
    assert!(output.status.success(), "stderr: {stderr}");

    let build = temp.path().join("build");
    assert!(!build.join(format!("pkgcraft{DLL_SUFFIX}")).exists());
    assert!(!build.join(format!("other{DLL_SUFFIX}")).exists());
    assert!(!build.join(".bridgebuild").exists());
    assert!(build.join("README").exists());

    let output = run_in(&temp, &["clean"]);
    let (stdout, _) = outputs(&output);
    assert!(output.status.success());
    assert!(stdout.contains("Nothing to clean"), "stdout: {stdout}");
}

#[test]
fn clean_single_target() {
    let temp = built_project();

    let output = run_in(&temp, &["clean", "--target", "pkgcraft"]);
    assert!(output.status.success());

    let build = temp.path().join("build");
    assert!(!build.join(format!("pkgcraft{DLL_SUFFIX}")).exists());
    assert!(!build.join(".bridgebuild/pkgcraft").exists());
    assert!(!build.join(".bridgebuild/pkgcraft/.fingerprint").exists());
    assert!(build.join(format!("other{DLL_SUFFIX}")).exists());
    assert!(build.join(".bridgebuild/other/.fingerprint").exists());
}
