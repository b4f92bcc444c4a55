//! Integration tests for the CLI interface
//!
//! Tests the main entry point, argument parsing and fatal error reporting

mod common;

use assert_cmd::Command;
use common::RaftFixture;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_help_default() {
    let temp = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("raft").unwrap();
    cmd.env("RAFT_DIR", temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_add_step_help() {
    let mut cmd = Command::cargo_bin("raft").unwrap();
    cmd.args(["add-step", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--alias"))
        .stdout(predicate::str::contains("--subworkflow"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("raft").unwrap();
    cmd.arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_setup_writes_configuration_and_templates() {
    let temp = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("raft").unwrap();
    cmd.args(["--raft-dir"])
        .arg(temp.path())
        .args(["setup", "--default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Setup complete."));

    let cfg = std::fs::read_to_string(temp.path().join(".raft.cfg")).unwrap();
    assert!(cfg.contains("\"nextflow_modules\""));
    // 4-space indentation
    assert!(cfg.contains("\n    \"filesystem\""));
    for name in [".init.cfg", ".init.wf", ".nextflow.config"] {
        assert!(temp.path().join(name).is_file(), "{name}");
    }
    for dir in ["projects", "references", "fastqs", "imgs", "metadata", "shared"] {
        assert!(temp.path().join(dir).is_dir(), "{dir}");
    }
}

#[test]
fn test_setup_again_keeps_previous_configuration() {
    let fixture = RaftFixture::new();
    fixture.raft().args(["setup", "-d"]).assert().success();
    assert!(fixture.raft_dir().join(".raft.cfg.orig").is_file());
}

#[test]
fn test_unknown_project_is_fatal() {
    let fixture = RaftFixture::new();
    fixture
        .raft()
        .args(["list-steps", "-p", "absent"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("absent"));
}

#[test]
fn test_invalid_branch_spec_is_rejected() {
    let fixture = RaftFixture::new();
    fixture.init_project("demo");
    fixture
        .raft()
        .args(["load-module", "-p", "demo", "-m", "alignment", "-b", "alignment:"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("alignment:"));
}

#[test]
fn test_clean_project_without_runs() {
    let fixture = RaftFixture::new();
    fixture.init_project("demo");
    fixture
        .raft()
        .args(["clean-project", "-p", "demo", "--no-exec"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("successful"));
}
