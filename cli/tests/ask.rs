//! # chatrs CLI Ask Integration Tests
//!
//! File: cli/tests/ask.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Runs `chatrs ask` end to end. Canned intents need no network at all; the
//! model path is exercised against a `wiremock` stand-in for the
//! chat-completion service, with the binary run on a blocking thread so the
//! mock keeps serving.
//!

mod common;
use common::*;
use predicates::prelude::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_ask_greeting_is_offline() {
    let (_dir, path) = offline_config("http://127.0.0.1:9");
    chatrs_cmd()
        .arg("--config")
        .arg(&path)
        .args(["ask", "hi"])
        .assert()
        .success()
        .stdout("Hey 👋 How can I help you?\n");
}

#[test]
fn test_ask_time_uses_configured_zone() {
    let (_dir, path) = offline_config("http://127.0.0.1:9");
    chatrs_cmd()
        .arg("--config")
        .arg(&path)
        .args(["ask", "what", "time", "is", "it"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^🕒 The current time is \d{2}:\d{2} [AP]M \(IST\)\.\n$").unwrap());
}

#[test]
fn test_ask_venues_for_configured_city() {
    let (_dir, path) = offline_config("http://127.0.0.1:9");
    chatrs_cmd()
        .arg("--config")
        .arg(&path)
        .args(["ask", "best bars near me"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Here are some of the best bars in Bengaluru:\n1. Toit Brewpub, Indiranagar\n",
        ));
}

#[test]
fn test_ask_junk_prints_nothing() {
    let (_dir, path) = offline_config("http://127.0.0.1:9");
    chatrs_cmd()
        .arg("--config")
        .arg(&path)
        .args(["ask", "?!"])
        .assert()
        .success()
        .stdout("");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_falls_back_to_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-integration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Borrowing lends a reference."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (dir, path) = offline_config(&server.uri());
    tokio::task::spawn_blocking(move || {
        chatrs_cmd()
            .env("OPENAI_API_KEY", "sk-integration")
            .arg("--config")
            .arg(&path)
            .args(["ask", "explain", "borrowing"])
            .assert()
            .success()
            .stdout("Borrowing lends a reference.\n");
        drop(dir);
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_model_failure_gives_apology() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let (dir, path) = offline_config(&server.uri());
    tokio::task::spawn_blocking(move || {
        chatrs_cmd()
            .env("OPENAI_API_KEY", "sk-integration")
            .arg("--config")
            .arg(&path)
            .args(["ask", "explain", "borrowing"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("Sorry, I'm having trouble"));
        drop(dir);
    })
    .await
    .unwrap();
}

#[test]
fn test_ask_without_api_key_apologises() {
    let (_dir, path) = offline_config("http://127.0.0.1:9");
    chatrs_cmd()
        .arg("--config")
        .arg(&path)
        .args(["ask", "tell me a story"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Sorry, I'm having trouble"));
}
