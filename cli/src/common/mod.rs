//! # chatrs Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared plumbing used by the chat domain (`chat::`) and the command
//! handlers (`commands::`), kept apart from the configuration and error
//! infrastructure in `core::`.
//!
//! ## Architecture
//!
//! - **`clock`**: The `Clock` seam over "now", with a hand-advanced test clock.
//! - **`locale`**: Resolving the UTC offset, zone label and city, statically or by IP.
//! - **`network`**: The shared `reqwest` client setup and response helpers.
//! - **`ui`**: Prompt, reply and toast output for the terminal commands.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::{clock::SystemClock, locale, network};
//!
//! let client = network::build_client(Duration::from_secs(10))?;
//! let source = locale::source_from_config(&config.locale, Arc::new(SystemClock))?;
//! ```
//!

/// Current-instant abstraction.
pub mod clock;
/// Ambient timezone and city resolution.
pub mod locale;
/// HTTP client construction and response helpers.
pub mod network;
/// Terminal prompt and reply formatting.
pub mod ui;
