//! # chatrs Command Modules
//!
//! File: cli/src/commands/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module aggregates the top-level commands of the chatrs CLI and the
//! flags they share. Each command defines its own arguments structure and an
//! async handler that `main.rs` routes to.
//!
//! ## Commands
//!
//! - `chat`: Interactive terminal conversation
//! - `ask`: One-shot question, reply on stdout
//! - `serve`: HTTP session API
//! - `feedback`: Post feedback to the configured webhook
//!
use crate::core::config::Config;
use crate::core::error::Result;
use clap::Args;

/// Interactive REPL over a single session.
pub mod chat;
/// One-shot question.
pub mod ask;
/// HTTP server exposing sessions over JSON.
pub mod serve;
/// Feedback webhook delivery.
pub mod feedback;

/// Per-invocation model settings shared by `chat` and `ask`.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelOverrides {
    /// Model identifier to use instead of `model.model`.
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature (0.0 to 1.0) instead of `model.temperature`.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Stream model replies as they are generated.
    #[arg(long)]
    pub stream: bool,
}

impl ModelOverrides {
    pub fn apply(self, config: Config) -> Result<Config> {
        config.with_model_overrides(self.model, self.temperature, self.stream)
    }
}
