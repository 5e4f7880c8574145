// ABOUTME: Integration tests for the bridgekeeper CLI commands.
// ABOUTME: Validates --help output, init behavior, and configuration errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn bridgekeeper_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bridgekeeper"));
    cmd.env_remove("BRIDGEKEEPER_CONTAINER");
    cmd
}

#[test]
fn help_shows_commands() {
    bridgekeeper_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn help_shows_global_flags() {
    bridgekeeper_cmd()
        .args(["scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--container"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("BRIDGEKEEPER_CONTAINER"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("bridgekeeper.yml");

    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    assert!(config_path.exists(), "bridgekeeper.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("markers:"), "Config should have markers");
    assert!(content.contains("# container:"), "Container should be commented out");
}

#[test]
fn init_records_container_flag() {
    let temp_dir = tempfile::tempdir().unwrap();

    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--container", "edge"])
        .assert()
        .success();

    let content = fs::read_to_string(temp_dir.path().join("bridgekeeper.yml")).unwrap();
    assert!(content.contains("container: edge"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("bridgekeeper.yml");

    fs::write(&config_path, "container: existing\n").unwrap();

    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("bridgekeeper.yml");

    fs::write(&config_path, "container: existing\n").unwrap();

    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("markers:"));
}

#[test]
fn scan_without_container_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .arg("scan")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: no container to manage"));
}

#[test]
fn missing_explicit_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .args(["plan", "--config", "absent.yml", "--container", "proxy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn invalid_config_fails_before_connecting() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("bridgekeeper.yml"),
        "container: proxy\nretry:\n  attempts: 0\n",
    )
    .unwrap();

    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry.attempts"));
}

#[test]
fn container_from_environment_passes_validation() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("bridgekeeper.yml"),
        "markers:\n  env: \"\"\n",
    )
    .unwrap();

    // The container comes from the environment, so validation reaches the markers check.
    bridgekeeper_cmd()
        .current_dir(temp_dir.path())
        .env("BRIDGEKEEPER_CONTAINER", "proxy")
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("markers.env"));
}
