//! Conversation data models.
//!
//! A session's history is an append-only list of turns. Turns are never edited
//! or removed once pushed.

use serde::{Deserialize, Serialize};

/// Greeting every session starts with.
pub const GREETING: &str = "Hello! I'm a SQL assistant named SQLInsight. \
    Use /connect to connect to the database (see /settings), then start chatting.";

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "text", rename_all = "lowercase")]
pub enum Turn {
    User(String),
    Assistant(String),
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Self::User(text) | Self::Assistant(text) => text,
        }
    }

    /// Speaker label used when the history is written into a prompt.
    pub fn speaker(&self) -> &'static str {
        match self {
            Self::User(_) => "Human",
            Self::Assistant(_) => "AI",
        }
    }
}

/// Ordered, append-only record of a session's turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Create a history seeded with the assistant greeting.
    pub fn new() -> Self {
        Self::with_greeting(GREETING)
    }

    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::assistant(greeting)],
        }
    }

    /// Append a turn and return a reference to it.
    pub fn push(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Serialize the history for prompt embedding, one `Speaker: text` line per turn.
    pub fn to_prompt_text(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker(), turn.text()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}
