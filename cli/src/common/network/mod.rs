//! # chatrs Network Utilities Module (`common::network`)
//!
//! File: cli/src/common/network/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the outbound HTTP calls chatrs makes: the chat-completion
//! service, the reference (Wikipedia) lookup, IP geolocation and the feedback
//! webhook. Every client is built here so timeouts and the user agent stay
//! consistent.
//!
//! ## Usage
//!
//! ```rust
//! let client = network::build_client(Duration::from_secs(10))?;
//! let response = client.get(url).send().await?;
//! if !response.status().is_success() {
//!     let body = network::error_body(response).await;
//! }
//! ```
//!
use crate::core::error::Result;
use anyhow::Context;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response};
use std::time::Duration;

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("chatrs/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept for logs and error messages.
const MAX_ERROR_BODY: usize = 512;

/// Builds a `reqwest::Client` with a whole-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Reads (and truncates) the body of a failed response for diagnostics.
pub async fn error_body(response: Response) -> String {
    match response.text().await {
        Ok(text) => truncate(text.trim(), MAX_ERROR_BODY),
        Err(e) => format!("<unreadable body: {}>", e),
    }
}

/// Parses a `Retry-After` header given in whole seconds.
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
