//! # chatrs Feedback Command
//!
//! File: cli/src/commands/feedback.rs
//! Author: Christi Mahu
//!
//! `chatrs feedback <text...>` posts the text to `feedback.url` and prints a
//! one-line result. A missing URL or a failed delivery is an error exit.

use crate::chat::feedback::FeedbackClient;
use crate::common::ui;
use crate::core::config::load_config;
use crate::core::error::Result;
use clap::Parser;
use std::io;
use std::path::Path;
use tracing::info;

#[derive(Parser, Debug)]
pub struct FeedbackArgs {
    /// Feedback text, as one or more words.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    pub text: Vec<String>,
}

pub async fn handle_feedback(args: FeedbackArgs, config_path: Option<&Path>) -> Result<()> {
    info!("Handling feedback command");
    let config = load_config(config_path)?;
    let client = FeedbackClient::from_config(&config.feedback)?;
    client.submit(&args.text.join(" ")).await?;
    ui::toast(&mut io::stdout(), true, "Thanks! Feedback sent.")?;
    Ok(())
}
