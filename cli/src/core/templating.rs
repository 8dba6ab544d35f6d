//! # chatrs Reply Templating
//!
//! File: cli/src/core/templating.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Canned replies (greeting, clock, venue lists, lookup and failure messages)
//! are Tera templates. The built-in wording lives here; any of it can be
//! replaced from the `[replies]` table of the configuration.
//!
//! ## Architecture
//!
//! All templates are compiled once into a single `Tera` instance when the
//! session factory is built, so a broken override is reported at startup
//! rather than in the middle of a conversation. Template names carry no
//! `.html` suffix, which keeps Tera's autoescaping off for plain chat text.
//!
//! ## Examples
//!
//! ```rust
//! let templates = ReplyTemplates::from_config(&config.replies)?;
//! let mut ctx = tera::Context::new();
//! ctx.insert("time", "02:05 PM");
//! ctx.insert("zone", "UTC");
//! let text = templates.render(ReplyKind::Time, &ctx)?;
//! ```
//!
use crate::core::config::RepliesConfig;
use crate::core::error::{ChatrsError, Result};
use anyhow::anyhow;
use tera::{Context, Tera};
use tracing::debug;

/// The canned reply slots a template can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Greeting,
    Time,
    Today,
    Tomorrow,
    Venues,
    ReferenceEmpty,
    ReferenceAmbiguous,
    ReferenceMissing,
    Apology,
    Cooldown,
}

impl ReplyKind {
    const ALL: [ReplyKind; 10] = [
        ReplyKind::Greeting,
        ReplyKind::Time,
        ReplyKind::Today,
        ReplyKind::Tomorrow,
        ReplyKind::Venues,
        ReplyKind::ReferenceEmpty,
        ReplyKind::ReferenceAmbiguous,
        ReplyKind::ReferenceMissing,
        ReplyKind::Apology,
        ReplyKind::Cooldown,
    ];

    fn name(self) -> &'static str {
        match self {
            ReplyKind::Greeting => "greeting",
            ReplyKind::Time => "time",
            ReplyKind::Today => "today",
            ReplyKind::Tomorrow => "tomorrow",
            ReplyKind::Venues => "venues",
            ReplyKind::ReferenceEmpty => "reference_empty",
            ReplyKind::ReferenceAmbiguous => "reference_ambiguous",
            ReplyKind::ReferenceMissing => "reference_missing",
            ReplyKind::Apology => "apology",
            ReplyKind::Cooldown => "cooldown",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            ReplyKind::Greeting => "Hey 👋 How can I help you?",
            ReplyKind::Time => "🕒 The current time is {{ time }} ({{ zone }}).",
            ReplyKind::Today => "📅 Today is {{ date }}.",
            ReplyKind::Tomorrow => "📅 Tomorrow is {{ date }}.",
            ReplyKind::Venues => {
                "Here are some of the best {{ label }} in {{ city }}:\n\
                 {% for item in items %}{{ loop.index }}. {{ item }}\n{% endfor %}"
            }
            ReplyKind::ReferenceEmpty => "Please tell me what the image is about.",
            ReplyKind::ReferenceAmbiguous => {
                "\"{{ subject }}\" could mean several things. Please be more specific."
            }
            ReplyKind::ReferenceMissing => "I couldn't find anything about {{ subject }}.",
            ReplyKind::Apology => {
                "Sorry, I'm having trouble reaching my brain right now. Please try again in a moment."
            }
            ReplyKind::Cooldown => {
                "⏳ I'm getting too many requests right now. Please wait {{ seconds }} seconds and try again."
            }
        }
    }

    fn override_from(self, replies: &RepliesConfig) -> Option<&str> {
        match self {
            ReplyKind::Greeting => replies.greeting.as_deref(),
            ReplyKind::Time => replies.time.as_deref(),
            ReplyKind::Today => replies.today.as_deref(),
            ReplyKind::Tomorrow => replies.tomorrow.as_deref(),
            ReplyKind::Venues => replies.venues.as_deref(),
            ReplyKind::ReferenceEmpty => replies.reference_empty.as_deref(),
            ReplyKind::ReferenceAmbiguous => replies.reference_ambiguous.as_deref(),
            ReplyKind::ReferenceMissing => replies.reference_missing.as_deref(),
            ReplyKind::Apology => replies.apology.as_deref(),
            ReplyKind::Cooldown => replies.cooldown.as_deref(),
        }
    }
}

/// Compiled reply templates.
#[derive(Debug, Clone)]
pub struct ReplyTemplates {
    tera: Tera,
}

impl ReplyTemplates {
    /// Compiles the built-in templates with any overrides applied.
    pub fn from_config(replies: &RepliesConfig) -> Result<Self> {
        let mut tera = Tera::default();
        for kind in ReplyKind::ALL {
            let source = match kind.override_from(replies) {
                Some(custom) => {
                    debug!("Using configured template for '{}'", kind.name());
                    custom
                }
                None => kind.builtin(),
            };
            tera.add_raw_template(kind.name(), source).map_err(|e| {
                anyhow!(ChatrsError::Template { source: e })
                    .context(format!("Failed to compile reply template '{}'", kind.name()))
            })?;
        }
        Ok(Self { tera })
    }

    /// Built-in templates only.
    pub fn builtin() -> Result<Self> {
        Self::from_config(&RepliesConfig::default())
    }

    /// Renders one reply. Trailing whitespace from loops is trimmed.
    pub fn render(&self, kind: ReplyKind, ctx: &Context) -> Result<String> {
        let rendered = self.tera.render(kind.name(), ctx).map_err(|e| {
            anyhow!(ChatrsError::Template { source: e })
                .context(format!("Failed to render reply template '{}'", kind.name()))
        })?;
        Ok(rendered.trim_end().to_string())
    }

    /// Renders a template that takes no variables.
    pub fn render_plain(&self, kind: ReplyKind) -> Result<String> {
        self.render(kind, &Context::new())
    }

    /// The fixed apology text. Falls back to the built-in wording if an
    /// override somehow fails to render, since this is the last-resort reply.
    pub fn apology(&self) -> String {
        self.render_plain(ReplyKind::Apology)
            .unwrap_or_else(|_| ReplyKind::Apology.builtin().to_string())
    }
}
