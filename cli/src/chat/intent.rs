//! # chatrs Intent Router
//!
//! File: cli/src/chat/intent.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Turns the latest user utterance into an `Intent` and, for the canned
//! intents, into a ready-made reply. Classification is pure: it looks only at
//! the utterance and the `AmbientContext` it is handed, so the same input under
//! a frozen clock always lands on the same intent and the same text.
//!
//! ## Rules
//!
//! Evaluated in this order; the first match wins:
//! 1. Greeting (exact phrase membership)
//! 2. Current time
//! 3. Today's date
//! 4. Tomorrow's date
//! 5. Venue suggestions (category keyword + qualifier + a known city)
//! 6. Image/photo reference lookup
//!
//! `Intent::Unmatched` is not an error; it sends the turn to the model.
//!
//! ## Matching modes
//!
//! `MatchMode::Substring` tests raw substrings of the lowercased text, so
//! "time complexity" asks for the clock. `MatchMode::Phrase` requires the clock
//! questions to be one of a fixed set of phrasings and matches the other
//! keywords as whole words.
//!
use crate::chat::venues::{display_city, normalize_city, VenueCatalog, VenueCategory};
use crate::common::locale::Locale;
use crate::core::config::MatchMode;
use crate::core::error::Result;
use crate::core::templating::{ReplyKind, ReplyTemplates};
use chrono::{DateTime, Days, FixedOffset, Utc};
use std::sync::Arc;
use tera::Context;
use tracing::debug;

/// What the router knows about the world when classifying a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientContext {
    pub now: DateTime<Utc>,
    pub locale: Locale,
}

impl AmbientContext {
    pub fn new(now: DateTime<Utc>, locale: Locale) -> Self {
        Self { now, locale }
    }

    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.now.with_timezone(&self.locale.offset)
    }
}

/// Classified user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    CurrentTime,
    Today,
    Tomorrow,
    Venues { category: VenueCategory, city: String },
    Reference { subject: String },
    Unmatched,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::CurrentTime => "time",
            Intent::Today => "today",
            Intent::Tomorrow => "tomorrow",
            Intent::Venues { .. } => "venues",
            Intent::Reference { .. } => "reference",
            Intent::Unmatched => "unmatched",
        }
    }
}

const GREETINGS: &[&str] = &[
    "hi",
    "hii",
    "hello",
    "hey",
    "hola",
    "namaste",
    "yo",
    "good morning",
    "good afternoon",
    "good evening",
];

const TIME_PHRASES: &[&str] = &[
    "time",
    "the time",
    "time now",
    "time please",
    "current time",
    "the current time",
    "tell me the time",
    "what is the time",
    "what's the time",
    "whats the time",
    "what is the time now",
    "what's the time now",
    "what time is it",
    "what time is it now",
];

const TODAY_PHRASES: &[&str] = &[
    "today",
    "date",
    "today's date",
    "todays date",
    "date today",
    "what is today",
    "what's today",
    "what is the date",
    "what's the date",
    "what is today's date",
    "what's today's date",
    "what day is it",
    "what day is it today",
];

const TOMORROW_PHRASES: &[&str] = &[
    "tomorrow",
    "tomorrow's date",
    "what is tomorrow",
    "what's tomorrow",
    "what day is tomorrow",
    "what day is it tomorrow",
    "what is tomorrow's date",
    "what's tomorrow's date",
];

const QUALIFIERS: &[&str] = &[
    "near me",
    "nearby",
    "suggest",
    "suggestions",
    "best",
    "recommend",
    "recommendations",
];

const REFERENCE_SUBSTRINGS: &[&str] = &["image", "photo", "picture"];

const REFERENCE_TOKENS: &[&str] = &[
    "image", "images", "photo", "photos", "picture", "pictures", "pic", "pics",
];

const SUBJECT_FILLERS: &[&str] = &[
    "a", "an", "the", "of", "show", "me", "tell", "about", "what", "what's", "whats", "is",
    "this", "that", "please", "can", "you", "give", "find", "describe", "explain", "who", "in",
    "my", "i", "want", "to", "see", "some", "for",
];

/// Lowercases, turns punctuation (apostrophes aside) into spaces and
/// collapses whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            '’' | '\'' => '\'',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-word (or whole-phrase) containment on normalized text.
fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    format!(" {} ", normalized).contains(&format!(" {} ", phrase))
}

/// Ordered rule set plus the data the canned replies need.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    mode: MatchMode,
    catalog: VenueCatalog,
    templates: Arc<ReplyTemplates>,
}

impl IntentRouter {
    pub fn new(mode: MatchMode, catalog: VenueCatalog, templates: Arc<ReplyTemplates>) -> Self {
        Self {
            mode,
            catalog,
            templates,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Picks the first rule that matches `utterance`.
    pub fn classify(&self, utterance: &str, ctx: &AmbientContext) -> Intent {
        let lowered = utterance.trim().to_lowercase();
        let normalized = normalize(utterance);

        let intent = if GREETINGS.contains(&normalized.as_str()) {
            Intent::Greeting
        } else if self.temporal(&lowered, &normalized, "time", TIME_PHRASES) {
            Intent::CurrentTime
        } else if self.temporal(&lowered, &normalized, "today", TODAY_PHRASES) {
            Intent::Today
        } else if self.temporal(&lowered, &normalized, "tomorrow", TOMORROW_PHRASES) {
            Intent::Tomorrow
        } else if let Some(intent) = self.venues(&lowered, &normalized, ctx) {
            intent
        } else if self.mentions_reference(&lowered, &normalized) {
            Intent::Reference {
                subject: reference_subject(&normalized),
            }
        } else {
            Intent::Unmatched
        };
        debug!("Classified {:?} as {}", utterance, intent.name());
        intent
    }

    /// Canned reply for `intent`.
    ///
    /// `None` means the intent needs outside help: a reference lookup for a
    /// named subject, or the model for `Unmatched`.
    pub fn answer(&self, intent: &Intent, ctx: &AmbientContext) -> Result<Option<String>> {
        let local = ctx.local_now();
        let mut vars = Context::new();
        let kind = match intent {
            Intent::Greeting => ReplyKind::Greeting,
            Intent::CurrentTime => {
                vars.insert("time", &local.format("%I:%M %p").to_string());
                vars.insert("zone", &ctx.locale.zone_label);
                ReplyKind::Time
            }
            Intent::Today => {
                vars.insert("date", &local.format("%A, %d %B %Y").to_string());
                ReplyKind::Today
            }
            Intent::Tomorrow => {
                let next = local.checked_add_days(Days::new(1)).unwrap_or(local);
                vars.insert("date", &next.format("%A, %d %B %Y").to_string());
                ReplyKind::Tomorrow
            }
            Intent::Venues { category, city } => {
                let Some(items) = self.catalog.lookup(city, *category) else {
                    return Ok(None);
                };
                vars.insert("label", category.label());
                vars.insert("city", &display_city(city));
                vars.insert("items", items);
                ReplyKind::Venues
            }
            Intent::Reference { subject } if subject.is_empty() => ReplyKind::ReferenceEmpty,
            Intent::Reference { .. } | Intent::Unmatched => return Ok(None),
        };
        self.templates.render(kind, &vars).map(Some)
    }

    fn temporal(&self, lowered: &str, normalized: &str, keyword: &str, phrases: &[&str]) -> bool {
        match self.mode {
            MatchMode::Substring => lowered.contains(keyword),
            MatchMode::Phrase => phrases.contains(&normalized),
        }
    }

    fn venues(&self, lowered: &str, normalized: &str, ctx: &AmbientContext) -> Option<Intent> {
        let (category, qualified) = match self.mode {
            MatchMode::Substring => (
                VenueCategory::KEYWORDS
                    .iter()
                    .find(|(kw, _)| lowered.contains(kw))
                    .map(|(_, category)| *category)?,
                QUALIFIERS.iter().any(|q| lowered.contains(q)),
            ),
            MatchMode::Phrase => (
                normalized
                    .split(' ')
                    .find_map(VenueCategory::from_keyword)?,
                QUALIFIERS.iter().any(|q| contains_phrase(normalized, q)),
            ),
        };
        if !qualified {
            return None;
        }
        let city = self
            .catalog
            .city_mentioned_in(normalized)
            .or_else(|| ctx.locale.city.as_deref().map(normalize_city))?;
        if self.catalog.lookup(&city, category).is_none() {
            debug!(
                "No {} list for '{}', leaving it to the model",
                category.label(),
                city
            );
            return None;
        }
        Some(Intent::Venues { category, city })
    }

    fn mentions_reference(&self, lowered: &str, normalized: &str) -> bool {
        match self.mode {
            MatchMode::Substring => REFERENCE_SUBSTRINGS.iter().any(|kw| lowered.contains(kw)),
            MatchMode::Phrase => normalized
                .split(' ')
                .any(|token| REFERENCE_TOKENS.contains(&token)),
        }
    }
}

/// What the user wants a picture of, minus trigger and filler words.
fn reference_subject(normalized: &str) -> String {
    normalized
        .split(' ')
        .filter(|token| !token.is_empty())
        .filter(|token| !REFERENCE_TOKENS.contains(token) && !SUBJECT_FILLERS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
