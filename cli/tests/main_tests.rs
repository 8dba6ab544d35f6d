//! # chatrs CLI Main Integration Tests
//!
//! File: cli/tests/main_tests.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Top-level behaviour of the `chatrs` binary: standard flags, the help
//! output, and how configuration errors are reported.
//!

mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_main_help_flag() {
    chatrs_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_main_version_flag() {
    chatrs_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_subcommand_fails() {
    chatrs_cmd().arg("dance").assert().failure();
}

#[test]
fn test_missing_config_file_is_reported() {
    chatrs_cmd()
        .args(["--config", "/definitely/not/here/chatrs.toml", "ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, path) = config_file("[model]\ntemperature = 3.5\n");
    chatrs_cmd()
        .arg("--config")
        .arg(&path)
        .args(["ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("temperature"));
}

#[test]
fn test_config_from_environment_variable() {
    let (_dir, path) = config_file("[replies]\ngreeting = \"Namaste from env\"\n");
    chatrs_cmd()
        .env("CHATRS_CONFIG", &path)
        .args(["ask", "hello"])
        .assert()
        .success()
        .stdout("Namaste from env\n");
}
