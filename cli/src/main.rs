//! # chatrs Main Entry Point
//!
//! File: cli/src/main.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This file serves as the main entry point for the chatrs CLI application.
//! It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to appropriate command handlers
//!
//! ## Architecture
//!
//! - Each top-level command (`chat`, `ask`, `serve`, `feedback`) is a variant in the `Commands` enum
//! - Commands are mapped to handler functions in their respective modules
//! - All errors are propagated to this level for consistent handling
//!
//! ## Examples
//!
//! ```bash
//! # Get help
//! chatrs --help
//!
//! # Chat with debug logging and a specific config file
//! chatrs -vv --config ./chatrs.toml chat
//!
//! # One-shot question
//! chatrs ask what is the date today
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging based on verbosity level
//! 3. Route to appropriate command handler
//! 4. Format and display any errors that occur
//!
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod chat; // Intent routing, model fallback, sessions
mod commands; // Handles specific command logic (chat, ask, serve, feedback)
mod common; // Shared utilities (clock, locale, network, ui)
mod core; // Core infrastructure (errors, config, templating)

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "chatrs",
    about = "💬 chatrs: a chat assistant with canned answers and a hosted-model fallback",
    long_about = "Answers greetings, the time and date, and venue suggestions from built-in rules,\n\
                  and hands everything else to an OpenAI-compatible chat-completion service.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Load exactly this configuration file instead of the user and project files.
    #[arg(long, global = true, env = "CHATRS_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Enum defining all available top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    /// Start an interactive conversation
    #[command(alias = "c")]
    Chat(commands::chat::ChatArgs),
    /// Ask a single question and print the reply
    Ask(commands::ask::AskArgs),
    /// Serve the session API over HTTP
    Serve(commands::serve::ServeArgs),
    /// Send feedback to the configured webhook
    Feedback(commands::feedback::FeedbackArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let config_path = cli.config.as_deref();
    let command_result = match cli.command {
        Commands::Chat(args) => commands::chat::handle_chat(args, config_path).await,
        Commands::Ask(args) => commands::ask::handle_ask(args, config_path).await,
        Commands::Serve(args) => commands::serve::handle_serve(args, config_path).await,
        Commands::Feedback(args) => commands::feedback::handle_feedback(args, config_path).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
