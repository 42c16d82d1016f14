//! Shared types used across modules
//!
//! This module contains types that are used by multiple modules
//! to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseSource {
    /// Keyword-subset match against the dataset
    Dataset,
    /// Generative-model fallback
    Generated,
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseSource::Dataset => write!(f, "dataset"),
            ResponseSource::Generated => write!(f, "generated"),
        }
    }
}

/// A resolved reply and its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ResponseSource,
}

impl Reply {
    pub fn dataset(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: ResponseSource::Dataset }
    }

    pub fn generated(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: ResponseSource::Generated }
    }
}

/// One question/answer exchange. Lives for a single turn only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user_input: String,
    pub resolved_answer: String,
    pub source: ResponseSource,
}

/// Session mode. Only decides whether the feedback loop runs after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    Learning,
    #[default]
    Talking,
}

impl Mode {
    pub fn from_learning(learning: bool) -> Self {
        if learning { Mode::Learning } else { Mode::Talking }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Learning => Mode::Talking,
            Mode::Talking => Mode::Learning,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Learning => write!(f, "Learning Mode"),
            Mode::Talking => write!(f, "Talking Mode"),
        }
    }
}

/// A user rating in 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Returns `None` when `value` is outside 1..=10
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw user input for one turn.
///
/// Recognition failure is its own variant so it can never be mistaken
/// for something the user actually said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Utterance {
    Typed(String),
    Spoken(String),
    Unrecognized,
}

impl Utterance {
    /// Text of the utterance, if any was captured
    pub fn text(&self) -> Option<&str> {
        match self {
            Utterance::Typed(text) | Utterance::Spoken(text) => Some(text),
            Utterance::Unrecognized => None,
        }
    }
}
