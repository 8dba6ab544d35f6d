//! # chatrs Error Types
//!
//! File: cli/src/core/error.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module defines the error types used throughout chatrs. Errors from the
//! hosted services never reach the person chatting: the session turns them into
//! apology or cooldown replies. They do reach the command handlers, the HTTP
//! layer and the logs, which is where these variants matter.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `ChatrsError`: A custom error enum using `thiserror` for specific error types
//! - `Result<T>`: A type alias for `anyhow::Result<T>` for flexible error handling
//!
//! ## Examples
//!
//! ```rust
//! // Detecting a rate limit deep inside an anyhow chain
//! let limited = err
//!     .downcast_ref::<ChatrsError>()
//!     .and_then(ChatrsError::retry_after_secs);
//! ```
//!
use thiserror::Error;

/// Custom error type for the chatrs application.
#[derive(Error, Debug)]
pub enum ChatrsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key not set. Export {env} or point model.api_key_env at another variable.")]
    MissingApiKey { env: String },

    #[error("Model service rate limited the request (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Model service returned {status}: {body}")]
    ModelApi { status: u16, body: String },

    #[error("Model service returned no completion text")]
    EmptyCompletion,

    #[error("Template rendering error: {source}")]
    Template {
        #[from]
        source: tera::Error,
    },

    #[error("Geolocation lookup failed: {0}")]
    Geolocation(String),

    #[error("Feedback could not be delivered: {0}")]
    Feedback(String),

    #[error("Session '{id}' not found.")]
    SessionNotFound { id: String },

    #[error("Session '{id}' is still waiting for a model response.")]
    SessionBusy { id: String },
}

impl ChatrsError {
    /// Returns the server-suggested wait for rate-limit errors.
    ///
    /// `Some(None)` means "rate limited, no hint"; `None` means this is not a
    /// rate-limit error at all.
    pub fn retry_after_secs(&self) -> Option<Option<u64>> {
        match self {
            ChatrsError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = ChatrsError::Config("temperature out of range".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: temperature out of range"
        );

        let missing = ChatrsError::MissingApiKey {
            env: "OPENAI_API_KEY".into(),
        };
        assert!(missing.to_string().starts_with("API key not set. Export OPENAI_API_KEY"));

        let busy = ChatrsError::SessionBusy { id: "abc".into() };
        assert_eq!(
            busy.to_string(),
            "Session 'abc' is still waiting for a model response."
        );
    }

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        let limited = ChatrsError::RateLimited {
            retry_after_secs: Some(12),
        };
        assert_eq!(limited.retry_after_secs(), Some(Some(12)));

        let unhinted = ChatrsError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(unhinted.retry_after_secs(), Some(None));

        assert_eq!(ChatrsError::EmptyCompletion.retry_after_secs(), None);
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = ChatrsError::RateLimited {
            retry_after_secs: Some(3),
        }
        .into();
        let err = err.context("calling chat completion");
        let found = err
            .downcast_ref::<ChatrsError>()
            .and_then(ChatrsError::retry_after_secs);
        assert_eq!(found, Some(Some(3)));
    }
}
