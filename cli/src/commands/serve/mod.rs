//! # chatrs Serve Command
//!
//! File: cli/src/commands/serve/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `chatrs serve` exposes conversations over a small JSON API so a browser
//! or another program can drive them. Every session created through the API
//! is independent and lives only as long as the process.
//!
//! ## Architecture
//!
//! - `config.rs`: Command-line arguments and the effective `ServerConfig`
//! - `routes.rs`: Handlers, shared `AppState` and error-to-status mapping
//! - `server_logic.rs`: Port selection, middleware, graceful shutdown
//!
//! ## Examples
//!
//! ```bash
//! chatrs serve --port 9000
//! curl -X POST localhost:9000/api/sessions
//! curl -X POST localhost:9000/api/sessions/<id>/messages \
//!      -H 'content-type: application/json' -d '{"text":"hi"}'
//! ```
//!
use crate::chat::feedback::FeedbackClient;
use crate::chat::session::SessionFactory;
use crate::core::config::load_config;
use crate::core::error::Result;
use std::path::Path;
use tracing::{debug, info};

pub use config::ServeArgs;

/// Listener arguments and effective server settings.
pub mod config;
/// Session API handlers.
pub mod routes;
/// Axum server lifecycle.
pub mod server_logic;

/// # Handle Serve Command (`handle_serve`)
///
/// Loads the main configuration, builds the session factory once, and runs
/// the server until shutdown.
pub async fn handle_serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    info!("Handling serve command with args: {:?}", args);
    let config = load_config(config_path)?;
    let factory = SessionFactory::from_config(&config)?;
    let feedback = match FeedbackClient::from_config(&config.feedback) {
        Ok(client) => Some(client),
        Err(e) => {
            debug!("Feedback endpoint disabled: {:#}", e);
            None
        }
    };
    let server_config = config::ServerConfig::from(&args);
    info!("Effective server config: {:?}", server_config);

    let state = routes::AppState::new(factory, feedback)
        .with_limits(server_config.session_idle, server_config.max_sessions);
    server_logic::run_server(server_config, state).await
}
