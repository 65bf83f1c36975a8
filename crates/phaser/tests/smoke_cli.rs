//! CLI-only smoke tests that don't require a container engine.
//!
//! Every failure exercised here happens before the runtime is called.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn phaser() -> Command {
    let mut cmd = Command::cargo_bin("phaser").unwrap();
    for var in [
        "PHASER_BUILDER_IMAGE",
        "PHASER_WORKSPACE_VOLUME",
        "PHASER_RUNTIME",
        "PHASER_RUNTIME_PATH",
        "PHASER_DOCKER_SOCKET",
        "PHASER_LOG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn settings_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("phaser.toml");
    fs::write(
        &path,
        "builder-image = \"cnbs/sample-builder:bionic\"\nworkspace-volume = \"pack-workspace-smoke\"\n",
    )
    .unwrap();
    path
}

#[test]
fn smoke_help_lists_run() {
    phaser()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"));
}

#[test]
fn smoke_run_help_shows_options() {
    phaser()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--daemon-access"))
        .stdout(predicate::str::contains("--registry"))
        .stdout(predicate::str::contains("--file"));
}

#[test]
fn smoke_missing_builder_image_fails() {
    phaser()
        .args(["run", "detect"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("builder-image"));
}

#[test]
fn smoke_invalid_settings_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("phaser.toml");
    fs::write(&path, "builder-image = [").unwrap();

    phaser()
        .arg("--config")
        .arg(&path)
        .args(["run", "detect"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn smoke_invalid_phase_name_fails_before_runtime() {
    let dir = TempDir::new().unwrap();
    phaser()
        .arg("--config")
        .arg(settings_file(&dir))
        .args(["run", "../bin/sh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to configure"));
}

#[test]
fn smoke_bad_file_mapping_fails() {
    let dir = TempDir::new().unwrap();
    phaser()
        .arg("--config")
        .arg(settings_file(&dir))
        .args(["run", "build", "--file", "no-destination"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HOST_PATH:CONTAINER_PATH"));
}

#[test]
fn smoke_missing_host_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.env");
    phaser()
        .arg("--config")
        .arg(settings_file(&dir))
        .args(["run", "build", "--file"])
        .arg(format!("{}:/platform/env/A", missing.display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn smoke_invalid_registry_reference_fails() {
    let dir = TempDir::new().unwrap();
    phaser()
        .arg("--config")
        .arg(settings_file(&dir))
        .env("DOCKER_CONFIG", dir.path())
        .args(["run", "export", "--registry", "Not/Lowercase"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to configure 'export' phase"));
}
