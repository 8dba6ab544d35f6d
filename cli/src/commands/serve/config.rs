//! # chatrs Server Configuration
//!
//! File: cli/src/commands/serve/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Command-line arguments for `chatrs serve` and the effective `ServerConfig`
//! built from them. Everything about the conversations themselves comes from
//! the main configuration file; this only covers where and how to listen.
//!
//! ## Examples
//!
//! ```bash
//! chatrs serve
//! chatrs serve --port 9000 --host 0.0.0.0 --no-cors
//! chatrs serve --session-idle-secs 600 --max-sessions 100
//! ```
//!
use clap::Parser;
use std::net::IpAddr;
use std::time::Duration;

/// # Serve Command Arguments (`ServeArgs`)
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on. If taken, the next free port is used.
    #[arg(long, short, default_value_t = 8080)]
    pub port: u16,

    /// Address to bind. `0.0.0.0` accepts connections from other machines.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Do not send CORS headers.
    #[arg(long)]
    pub no_cors: bool,

    /// Drop sessions untouched for this many seconds.
    #[arg(long, default_value_t = 3600, value_name = "SECS")]
    pub session_idle_secs: u64,

    /// Refuse new sessions beyond this many.
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_sessions: u64,
}

/// # Effective Server Configuration (`ServerConfig`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub host: IpAddr,
    pub enable_cors: bool,
    pub session_idle: Duration,
    pub max_sessions: usize,
}

impl From<&ServeArgs> for ServerConfig {
    fn from(args: &ServeArgs) -> Self {
        Self {
            port: args.port,
            host: args.host,
            enable_cors: !args.no_cors,
            session_idle: Duration::from_secs(args.session_idle_secs),
            max_sessions: usize::try_from(args.max_sessions).unwrap_or(usize::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_defaults_and_flags() {
        let args = ServeArgs::try_parse_from(["serve"]).unwrap();
        assert_eq!(
            ServerConfig::from(&args),
            ServerConfig {
                port: 8080,
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                enable_cors: true,
                session_idle: Duration::from_secs(3600),
                max_sessions: 1024,
            }
        );

        let args =
            ServeArgs::try_parse_from(["serve", "-p", "9000", "--host", "0.0.0.0", "--no-cors"])
                .unwrap();
        let config = ServerConfig::from(&args);
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(!config.enable_cors);
    }

    #[test]
    fn test_session_limits() {
        let args = ServeArgs::try_parse_from([
            "serve",
            "--session-idle-secs",
            "600",
            "--max-sessions",
            "10",
        ])
        .unwrap();
        let config = ServerConfig::from(&args);
        assert_eq!(config.session_idle, Duration::from_secs(600));
        assert_eq!(config.max_sessions, 10);
        assert!(ServeArgs::try_parse_from(["serve", "--max-sessions", "0"]).is_err());
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(ServeArgs::try_parse_from(["serve", "--host", "not-an-ip"]).is_err());
    }
}
