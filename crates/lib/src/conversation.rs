//! Conversation history for one learner session.
//!
//! An ordered, append-only list of turns held in memory. The whole list is the transcript
//! replayed to the model on every request; there is no windowing or summarization.

use crate::llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded message with the wall-clock time (HH:MM:SS) it was appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    timestamp: String,
}

impl Turn {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// In-memory turn list (append, clear, snapshot).
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new turn stamped with the current local time.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Turn {
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        self.turns.push(Turn {
            role,
            content: content.into(),
            timestamp,
        });
        log::debug!("appended {} turn #{}", role, self.turns.len());
        &self.turns[self.turns.len() - 1]
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Owned copy of every turn, oldest first. Later appends are not visible through it.
    pub fn all(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
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

    /// The transcript as role/content pairs for the completion request.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|t| ChatMessage::new(t.role, t.content.clone()))
            .collect()
    }
}
