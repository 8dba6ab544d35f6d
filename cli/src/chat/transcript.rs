//! # chatrs Session Transcript
//!
//! File: cli/src/chat/transcript.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! The ordered record of one conversation. Turns are immutable once pushed;
//! the transcript only grows, except for an explicit `clear()` and the
//! optional bound on non-system turns.
//!
//! ## Invariants
//!
//! - At most one `system` turn, always at index 0.
//! - With a bound of `n`, at most `n` non-system turns are kept; the oldest
//!   go first, and the kept conversation never starts with an assistant turn.
//!
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered, append-only list of turns owned by a single session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    /// `None` keeps every turn.
    max_turns: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript keeping at most `max_turns` non-system turns.
    pub fn bounded(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: Some(max_turns.max(1)),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Turn::new(Role::User, text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Turn::new(Role::Assistant, text));
    }

    /// Inserts the leading system turn unless one is already present.
    /// Returns whether a turn was inserted.
    pub fn ensure_system(&mut self, prompt: &str) -> bool {
        if self.has_system() {
            return false;
        }
        self.turns.insert(0, Turn::new(Role::System, prompt));
        true
    }

    pub fn has_system(&self) -> bool {
        self.turns
            .first()
            .is_some_and(|turn| turn.role == Role::System)
    }

    /// Drops every turn, the system turn included.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        let Some(max) = self.max_turns else {
            return;
        };
        let head = usize::from(self.has_system());
        let mut evicted = 0;
        while self.turns.len() - head > max {
            self.turns.remove(head);
            evicted += 1;
        }
        if evicted > 0 {
            while self.turns.len() > head && self.turns[head].role == Role::Assistant {
                self.turns.remove(head);
                evicted += 1;
            }
            debug!("Transcript bound reached, evicted {} oldest turn(s)", evicted);
        }
    }
}
