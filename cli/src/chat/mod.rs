//! # chatrs Chat Domain (`chat`)
//!
//! File: cli/src/chat/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Everything that turns a user message into an assistant reply. The
//! commands (`chat`, `ask`, `serve`) only ever talk to `session`; the rest of
//! this module is what a session is built from.
//!
//! ## Architecture
//!
//! - **`transcript`**: Ordered, optionally bounded list of turns.
//! - **`intent`**: Rule-based classification and canned replies.
//! - **`venues`**: Static (city, category) suggestion lists.
//! - **`reference`**: Subject summaries for the image/photo rule.
//! - **`model`**: The `ChatModel` trait and its OpenAI-compatible client.
//! - **`fallback`**: Retry, rate-limit lockout and apology policy around the model.
//! - **`feedback`**: Webhook delivery of user feedback.
//! - **`session`**: Per-conversation state and the `SessionFactory`.
//!
pub mod fallback;
pub mod feedback;
pub mod intent;
pub mod model;
pub mod reference;
pub mod session;
pub mod transcript;
pub mod venues;
