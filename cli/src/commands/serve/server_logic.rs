//! # chatrs HTTP Server Implementation
//!
//! File: cli/src/commands/serve/server_logic.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Runs the session API for `chatrs serve`:
//! - Port availability checking with automatic fallback
//! - Request tracing and optional permissive CORS
//! - Graceful shutdown on Ctrl+C or SIGTERM
//!
//! ## Architecture
//!
//! 1. Find an available port, starting at the requested one
//! 2. Build the router from `routes::api_router` and wrap it in middleware
//! 3. Print the listening URLs
//! 4. Serve until a shutdown signal arrives
//!
//! ## Examples
//!
//! ```rust
//! let state = AppState::new(SessionFactory::from_config(&config)?, feedback);
//! server_logic::run_server(ServerConfig::from(&args), state).await?;
//! ```
//!
use super::config::ServerConfig;
use super::routes::{api_router, AppState};
use crate::core::error::Result;
use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};

/// Ports tried after the requested one before giving up.
const MAX_PORT_ATTEMPTS: u8 = 10;

/// # Run HTTP Server (`run_server`)
///
/// Binds the first free port from `config.port` upward and serves the session
/// API until Ctrl+C or SIGTERM. Requests in flight are allowed to finish.
///
/// ## Arguments
///
/// * `config`: Listener settings (port, host, CORS, session limits).
/// * `state`: The session map and collaborators shared by every handler.
///
/// ## Returns
///
/// * `Result<()>`: `Ok(())` once the server has shut down cleanly.
///
/// ## Errors
///
/// - No free port within `MAX_PORT_ATTEMPTS`
/// - The listener cannot be bound (e.g., permissions)
/// - The server fails while running
pub async fn run_server(config: ServerConfig, state: AppState) -> Result<()> {
    // 1. Find a free port, starting at the requested one
    let addr = find_available_port(config.host, config.port, MAX_PORT_ATTEMPTS).await?;

    // 2. Build the router with its middleware
    let app = create_app(&config, state);

    // 3. Tell the user where to find it

    println!("\n=================================================================");
    println!("💬 chatrs session API");
    println!("🌐 Local URL:          http://localhost:{}", addr.port());
    println!("⚙️  Binding to address: {}", addr);
    println!("🔒 CORS enabled:       {}", config.enable_cors);
    println!(
        "🧹 Sessions:           up to {}, dropped after {}s idle",
        config.max_sessions,
        config.session_idle.as_secs()
    );
    println!("=================================================================\n");

    info!("Starting server on {}", addr);
    println!("Server starting! Press Ctrl+C to stop.");

    // 4. Bind for real and serve until a shutdown signal
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener to address {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    println!("\nServer shutdown complete.");
    Ok(())
}

/// # Handle Shutdown Signal (`shutdown_signal`)
///
/// Resolves on Ctrl+C, or SIGTERM on Unix. If a handler cannot be installed
/// that branch never resolves and the other one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                error!(
                    "Failed to install SIGTERM handler: {}. Shutdown on SIGTERM might not work.",
                    e
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// # Find Available Port (`find_available_port`)
///
/// Tries `start_port`, then each following port, up to `max_attempts` ports
/// in total. The trial listener is dropped before returning.
///
/// ## Returns
///
/// * `Result<SocketAddr>`: The first address that could be bound, or an error
///   once `max_attempts` ports (or the top of the port range) are exhausted.
async fn find_available_port(
    req_host: std::net::IpAddr,
    start_port: u16,
    max_attempts: u8,
) -> Result<SocketAddr> {
    let mut current_port = start_port;

    // Try each port in turn; the first successful bind wins
    for attempt in 0..max_attempts {
        let addr = SocketAddr::new(req_host, current_port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                drop(listener);
                if attempt > 0 {
                    info!(
                        "Port {} was unavailable, successfully bound to available port {}.",
                        start_port, current_port
                    );
                }
                return Ok(addr);
            }
            Err(e) => {
                warn!(
                    "Attempt {}: Port {} on host {} is unavailable (Error: {}). Trying next port...",
                    attempt + 1,
                    current_port,
                    req_host,
                    e
                );
                current_port = match current_port.checked_add(1) {
                    Some(next) => next,
                    None => break,
                };
            }
        }
    }

    anyhow::bail!(
        "Could not find an available port on host {} starting from port {} after trying {} ports.",
        req_host,
        start_port,
        max_attempts
    )
}

/// # Create Axum Application (`create_app`)
///
/// The session API wrapped in request tracing and, unless disabled, a
/// permissive CORS layer for browser front-ends.
fn create_app(config: &ServerConfig, state: AppState) -> Router {
    // Permissive CORS lets a browser page on another origin drive the API
    let cors_layer = if config.enable_cors {
        info!("CORS middleware enabled (permissive).");
        CorsLayer::permissive()
    } else {
        info!("CORS middleware disabled.");
        CorsLayer::new()
    };

    // Log each request and response at INFO
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default().include_headers(true))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    api_router(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer)
            .layer(cors_layer),
    )
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::SessionFactory;
    use crate::core::config::Config;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(SessionFactory::from_config(&Config::default()).unwrap(), None)
    }

    #[tokio::test]
    async fn test_find_available_port_start_is_free() -> Result<()> {
        let host = Ipv4Addr::LOCALHOST.into();
        let start_port = 50080;
        let addr = find_available_port(host, start_port, 5).await?;
        assert_eq!(addr.port(), start_port);
        assert_eq!(addr.ip(), host);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_available_port_start_occupied() -> Result<()> {
        let host = Ipv4Addr::LOCALHOST.into();
        let start_port = 51080;
        let _listener = TcpListener::bind(SocketAddr::new(host, start_port)).await?;

        let addr = find_available_port(host, start_port, 5).await?;
        assert!(addr.port() > start_port);
        assert!(addr.port() < start_port + 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_cors_layer_answers_preflight() {
        let config = ServerConfig {
            port: 0,
            host: Ipv4Addr::LOCALHOST.into(),
            enable_cors: true,
            session_idle: Duration::from_secs(60),
            max_sessions: 8,
        };
        let app = create_app(&config, state());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/sessions")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_no_cors_headers_when_disabled() {
        let config = ServerConfig {
            port: 0,
            host: Ipv4Addr::LOCALHOST.into(),
            enable_cors: false,
            session_idle: Duration::from_secs(60),
            max_sessions: 8,
        };
        let app = create_app(&config, state());
        let response = app
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_shutdown_signal_creation() {
        let shutdown_future = shutdown_signal();
        drop(shutdown_future);
    }
}
