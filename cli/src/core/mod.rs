//! # chatrs Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure components that provide
//! foundational functionality for chatrs: configuration, error management,
//! and reply templating.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading, merging, and validation
//! - `error`: Error types and error handling utilities
//! - `templating`: Tera templates for canned replies
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{ChatrsError, Result}; // For error handling
//! use crate::core::templating::{ReplyKind, ReplyTemplates}; // For canned replies
//! ```
//!
pub mod config;
pub mod error;
pub mod templating;
