//! # chatrs CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the integration test crates in `cli/tests/`. Every
//! test runs the real `chatrs` binary against a throwaway config file passed
//! with `--config`, so user and project configuration never leak in.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// # Get chatrs Command (`chatrs_cmd`)
///
/// An `assert_cmd::Command` for the compiled `chatrs` binary, with the
/// variables that would change its behaviour cleared.
pub fn chatrs_cmd() -> Command {
    let mut cmd = Command::cargo_bin("chatrs").expect("Failed to find chatrs binary for testing");
    cmd.env_remove("CHATRS_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY");
    cmd
}

/// Writes `body` as a config file inside a fresh temp dir.
///
/// Keep the `TempDir` alive for as long as the path is used.
pub fn config_file(body: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("chatrs.toml");
    fs::write(&path, body).expect("Failed to write test config");
    (dir, path)
}

/// A config that pins the locale and points every service at `base_url`.
pub fn offline_config(base_url: &str) -> (TempDir, PathBuf) {
    config_file(&format!(
        r#"
[model]
base_url = "{base_url}/v1"
model = "test-model"
timeout_secs = 5

[locale]
utc_offset = "+05:30"
zone_label = "IST"
city = "bengaluru"

[reference]
base_url = "{base_url}/rest"

[feedback]
url = "{base_url}/feedback"
"#
    ))
}
