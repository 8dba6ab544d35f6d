//! # chatrs Model Fallback
//!
//! File: cli/src/chat/fallback.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Wraps a `ChatModel` with the policy for turns no rule could answer. The
//! caller always gets text back: the completion, the fixed apology, or the
//! cooldown notice while a rate-limit lockout is active. Failures are logged
//! here and go no further.
//!
//! ## Policy
//!
//! - HTTP 429 starts a lockout for `Retry-After` seconds (or
//!   `model.cooldown_secs` when the header is absent). While locked out no
//!   request is sent and the cooldown template is returned.
//! - Any other failure is retried once after `model.retry_delay_ms` when
//!   `model.retry_once` is set; a second failure gives the apology.
//! - A streamed attempt that already forwarded text is never retried, so the
//!   sink only ever sees one reply.
//!
use crate::chat::model::{ChatModel, CompletionRequest, DeltaSink};
use crate::chat::session::ReplySource;
use crate::chat::transcript::Turn;
use crate::common::clock::Clock;
use crate::core::config::ModelConfig;
use crate::core::error::ChatrsError;
use crate::core::templating::{ReplyKind, ReplyTemplates};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tera::Context;
use tracing::{info, warn};

/// Upper bound on any lockout, whatever the server asks for.
pub const MAX_COOLDOWN_SECS: u64 = 86_400;

/// What the fallback produced for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReply {
    pub text: String,
    pub source: ReplySource,
    /// True when the text already went out through the delta sink.
    pub streamed: bool,
}

/// The model call plus its retry and lockout policy.
pub struct ModelFallback {
    model: Arc<dyn ChatModel>,
    model_name: String,
    temperature: f64,
    retry_delay: Option<Duration>,
    cooldown_secs: u64,
    templates: Arc<ReplyTemplates>,
    clock: Arc<dyn Clock>,
    locked_until: Mutex<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for ModelFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFallback")
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("retry_delay", &self.retry_delay)
            .field("cooldown_secs", &self.cooldown_secs)
            .finish_non_exhaustive()
    }
}

impl ModelFallback {
    pub fn new(
        model: Arc<dyn ChatModel>,
        config: &ModelConfig,
        templates: Arc<ReplyTemplates>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            model,
            model_name: config.model.clone(),
            temperature: config.temperature,
            retry_delay: config
                .retry_once
                .then(|| Duration::from_millis(config.retry_delay_ms)),
            cooldown_secs: config.cooldown_secs,
            templates,
            clock,
            locked_until: Mutex::new(None),
        }
    }

    /// Seconds left on the lockout, if one is active.
    pub fn cooldown_remaining(&self) -> Option<u64> {
        let now = self.clock.now();
        let mut guard = self.locked_until.lock().unwrap_or_else(|e| e.into_inner());
        match *guard {
            Some(until) if until > now => {
                let millis = (until - now).num_milliseconds();
                Some(((millis + 999) / 1000).max(1) as u64)
            }
            Some(_) => {
                info!("Rate-limit cooldown over, model calls resume");
                *guard = None;
                None
            }
            None => None,
        }
    }

    /// Drops any active lockout.
    pub fn reset(&self) {
        *self.locked_until.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Produces the reply for `turns`, whose last entry is the user turn.
    /// With a `sink`, completion text is streamed through it as it arrives.
    pub async fn reply(&self, turns: &[Turn], mut sink: Option<DeltaSink<'_>>) -> FallbackReply {
        if let Some(seconds) = self.cooldown_remaining() {
            info!("Skipping model call, {}s of cooldown left", seconds);
            return self.cooldown_reply(seconds);
        }

        let mut attempt = 1;
        loop {
            let request = CompletionRequest {
                model: &self.model_name,
                temperature: self.temperature,
                turns,
            };
            let mut forwarded = false;
            let result = match sink.as_mut() {
                Some(sink) => {
                    let mut tracked = |delta: &str| {
                        forwarded |= !delta.is_empty();
                        (*sink)(delta);
                    };
                    self.model.complete_streaming(request, &mut tracked).await
                }
                None => self.model.complete(request).await,
            };
            let err = match result {
                Ok(text) => {
                    return FallbackReply {
                        text,
                        source: ReplySource::Model,
                        streamed: sink.is_some(),
                    }
                }
                Err(err) => err,
            };

            if let Some(hint) = err
                .downcast_ref::<ChatrsError>()
                .and_then(ChatrsError::retry_after_secs)
            {
                let seconds = hint
                    .unwrap_or(self.cooldown_secs)
                    .clamp(1, MAX_COOLDOWN_SECS);
                warn!("Model rate limited, cooling down for {}s", seconds);
                *self.locked_until.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(self.lockout_end(seconds));
                return self.cooldown_reply(seconds);
            }

            match self.retry_delay {
                Some(_) if forwarded => {
                    warn!("Streamed model call failed part-way, not retrying: {:#}", err);
                    return self.apology();
                }
                Some(delay) if attempt == 1 => {
                    warn!(
                        "Model call failed, retrying in {}ms: {:#}",
                        delay.as_millis(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                _ => {
                    warn!("Model call failed after {} attempt(s): {:#}", attempt, err);
                    return self.apology();
                }
            }
        }
    }

    fn lockout_end(&self, seconds: u64) -> DateTime<Utc> {
        let now = self.clock.now();
        ChronoDuration::try_seconds(seconds as i64)
            .and_then(|span| now.checked_add_signed(span))
            .unwrap_or(now + ChronoDuration::seconds(MAX_COOLDOWN_SECS as i64))
    }

    fn apology(&self) -> FallbackReply {
        FallbackReply {
            text: self.templates.apology(),
            source: ReplySource::Apology,
            streamed: false,
        }
    }

    fn cooldown_reply(&self, seconds: u64) -> FallbackReply {
        let mut vars = Context::new();
        vars.insert("seconds", &seconds);
        let text = self
            .templates
            .render(ReplyKind::Cooldown, &vars)
            .unwrap_or_else(|e| {
                warn!("Cooldown template failed, sending apology: {:#}", e);
                self.templates.apology()
            });
        FallbackReply {
            text,
            source: ReplySource::Cooldown,
            streamed: false,
        }
    }
}
