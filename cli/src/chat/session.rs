//! # chatrs Chat Session
//!
//! File: cli/src/chat/session.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! A `Session` is one conversation: its transcript, its rate-limit lockout
//! and a two-state machine (`Idle` → `AwaitingModelResponse` → `Idle`). Every
//! accepted user turn gets exactly one assistant turn, whichever path
//! produced it.
//!
//! ## Architecture
//!
//! For each message the session:
//! 1. Drops junk input (empty, or nothing alphanumeric) without recording it.
//! 2. Appends the user turn.
//! 3. Builds the `AmbientContext` from the clock and the locale source.
//! 4. Classifies with the `IntentRouter`.
//! 5. Answers from the canned rule, the reference lookup, or the model
//!    fallback, inserting the system turn before the first model call.
//! 6. Appends the assistant turn.
//!
//! `SessionFactory` holds the collaborators that carry no per-conversation
//! state and hands them to each new session behind `Arc`s.
//!
//! ## Examples
//!
//! ```rust
//! let factory = SessionFactory::from_config(&config)?;
//! let mut session = factory.create();
//! if let Some(reply) = session.handle("hi").await {
//!     println!("{}", reply.text);
//! }
//! ```
//!
use crate::chat::fallback::ModelFallback;
use crate::chat::intent::{AmbientContext, Intent, IntentRouter};
use crate::chat::model::{ChatModel, DeltaSink, OpenAiCompatible};
use crate::chat::reference::{ReferenceLookup, ReferenceOutcome, WikipediaLookup};
use crate::chat::transcript::Transcript;
use crate::chat::venues::VenueCatalog;
use crate::common::clock::{Clock, SystemClock};
use crate::common::locale::{self, LocaleSource};
use crate::common::network;
use crate::core::config::{Config, ModelConfig};
use crate::core::error::Result;
use crate::core::templating::{ReplyKind, ReplyTemplates};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tera::Context;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a session is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingModelResponse,
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// A canned rule, named after its intent.
    Rule(&'static str),
    Reference,
    Model,
    Apology,
    Cooldown,
}

impl ReplySource {
    pub fn label(self) -> &'static str {
        match self {
            ReplySource::Rule(name) => name,
            ReplySource::Reference => "reference",
            ReplySource::Model => "model",
            ReplySource::Apology => "apology",
            ReplySource::Cooldown => "cooldown",
        }
    }
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The assistant's answer to one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    /// The text was already written out delta by delta.
    pub streamed: bool,
}

/// Input with nothing to answer: empty, or no letters or digits at all.
pub fn is_junk(input: &str) -> bool {
    !input.chars().any(char::is_alphanumeric)
}

/// Builds sessions that share the stateless collaborators.
#[derive(Clone)]
pub struct SessionFactory {
    router: Arc<IntentRouter>,
    templates: Arc<ReplyTemplates>,
    model: Arc<dyn ChatModel>,
    model_config: ModelConfig,
    reference: Arc<dyn ReferenceLookup>,
    locale: Arc<dyn LocaleSource>,
    clock: Arc<dyn Clock>,
    system_prompt: Arc<str>,
    max_turns: usize,
}

impl fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("model", &self.model_config.model)
            .field("match_mode", &self.router.mode())
            .field("max_turns", &self.max_turns)
            .finish_non_exhaustive()
    }
}

impl SessionFactory {
    /// Wires the real HTTP-backed collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let templates = Arc::new(ReplyTemplates::from_config(&config.replies)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let router = IntentRouter::new(
            config.router.match_mode,
            VenueCatalog::with_entries(&config.venues),
            templates.clone(),
        );
        let reference_client = network::build_client(Duration::from_secs(10))?;
        debug!(
            "Session factory: model {} at {}, match mode {:?}",
            config.model.model, config.model.base_url, config.router.match_mode
        );
        Ok(Self {
            router: Arc::new(router),
            templates,
            model: Arc::new(OpenAiCompatible::from_config(&config.model)?),
            model_config: config.model.clone(),
            reference: Arc::new(WikipediaLookup::new(
                reference_client,
                &config.reference.base_url,
            )),
            locale: locale::source_from_config(&config.locale, clock.clone())?,
            clock,
            system_prompt: Arc::from(config.assistant.system_prompt.as_str()),
            max_turns: config.transcript.max_turns,
        })
    }

    #[cfg(test)]
    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = model;
        self
    }

    #[cfg(test)]
    pub fn with_reference(mut self, reference: Arc<dyn ReferenceLookup>) -> Self {
        self.reference = reference;
        self
    }

    #[cfg(test)]
    pub fn with_locale(mut self, locale: Arc<dyn LocaleSource>) -> Self {
        self.locale = locale;
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts a fresh, empty session.
    pub fn create(&self) -> Session {
        let transcript = if self.max_turns == 0 {
            Transcript::new()
        } else {
            Transcript::bounded(self.max_turns)
        };
        let session = Session {
            id: Uuid::new_v4(),
            transcript,
            state: SessionState::Idle,
            router: self.router.clone(),
            templates: self.templates.clone(),
            fallback: ModelFallback::new(
                self.model.clone(),
                &self.model_config,
                self.templates.clone(),
                self.clock.clone(),
            ),
            reference: self.reference.clone(),
            locale: self.locale.clone(),
            clock: self.clock.clone(),
            system_prompt: self.system_prompt.clone(),
        };
        info!("Session {} started", session.id);
        session
    }
}

/// One conversation.
pub struct Session {
    id: Uuid,
    transcript: Transcript,
    state: SessionState,
    router: Arc<IntentRouter>,
    templates: Arc<ReplyTemplates>,
    fallback: ModelFallback,
    reference: Arc<dyn ReferenceLookup>,
    locale: Arc<dyn LocaleSource>,
    clock: Arc<dyn Clock>,
    system_prompt: Arc<str>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("turns", &self.transcript.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Empties the transcript and lifts any rate-limit lockout.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.fallback.reset();
        self.state = SessionState::Idle;
        info!("Session {} cleared", self.id);
    }

    /// Answers one user message. `None` means the input was ignored.
    pub async fn handle(&mut self, input: &str) -> Option<Reply> {
        self.respond(input, None).await
    }

    /// Like `handle`, forwarding model text to `sink` as it arrives.
    /// Replies with `streamed == false` never went through the sink.
    pub async fn handle_streaming(&mut self, input: &str, sink: DeltaSink<'_>) -> Option<Reply> {
        self.respond(input, Some(sink)).await
    }

    async fn respond(&mut self, input: &str, sink: Option<DeltaSink<'_>>) -> Option<Reply> {
        if is_junk(input) {
            debug!("Session {}: ignoring input {:?}", self.id, input);
            return None;
        }
        // A cancelled model call leaves nothing in flight.
        self.state = SessionState::Idle;
        let input = input.trim();
        self.transcript.push_user(input);

        let ctx = AmbientContext::new(self.clock.now(), self.locale.locale().await);
        let intent = self.router.classify(input, &ctx);
        let reply = match self.router.answer(&intent, &ctx) {
            Ok(Some(text)) => Reply {
                text,
                source: ReplySource::Rule(intent.name()),
                streamed: false,
            },
            Ok(None) => match &intent {
                Intent::Reference { subject } => self.look_up(subject).await,
                _ => self.ask_model(sink).await,
            },
            Err(e) => {
                warn!("Session {}: canned reply failed: {:#}", self.id, e);
                self.apology()
            }
        };

        self.transcript.push_assistant(reply.text.clone());
        debug!(
            "Session {}: replied via {} ({} turns)",
            self.id,
            reply.source,
            self.transcript.len()
        );
        Some(reply)
    }

    async fn ask_model(&mut self, sink: Option<DeltaSink<'_>>) -> Reply {
        if self.transcript.ensure_system(&self.system_prompt) {
            debug!("Session {}: system prompt inserted", self.id);
        }
        self.state = SessionState::AwaitingModelResponse;
        let outcome = self.fallback.reply(self.transcript.turns(), sink).await;
        self.state = SessionState::Idle;
        Reply {
            text: outcome.text,
            source: outcome.source,
            streamed: outcome.streamed,
        }
    }

    async fn look_up(&self, subject: &str) -> Reply {
        let mut vars = Context::new();
        vars.insert("subject", subject);
        let rendered = match self.reference.lookup(subject).await {
            Ok(ReferenceOutcome::Summary { title, extract }) => {
                debug!("Session {}: reference hit '{}'", self.id, title);
                return Reply {
                    text: extract,
                    source: ReplySource::Reference,
                    streamed: false,
                };
            }
            Ok(ReferenceOutcome::Ambiguous) => {
                self.templates.render(ReplyKind::ReferenceAmbiguous, &vars)
            }
            Ok(ReferenceOutcome::NotFound) => {
                self.templates.render(ReplyKind::ReferenceMissing, &vars)
            }
            Err(e) => {
                warn!("Session {}: reference lookup failed: {:#}", self.id, e);
                return self.apology();
            }
        };
        match rendered {
            Ok(text) => Reply {
                text,
                source: ReplySource::Reference,
                streamed: false,
            },
            Err(e) => {
                warn!("Session {}: reference reply failed: {:#}", self.id, e);
                self.apology()
            }
        }
    }

    fn apology(&self) -> Reply {
        Reply {
            text: self.templates.apology(),
            source: ReplySource::Apology,
            streamed: false,
        }
    }
}
