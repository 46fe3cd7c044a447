//! UI-agnostic transcript types
//!
//! A transcript is the ordered list of turns exchanged with the backend.
//! Both the terminal UI and the one-shot CLI commands read it through
//! [`crate::session::ChatSession`]; nothing outside this crate can edit
//! or reorder a turn once it has been appended.

use serde::{Deserialize, Serialize};

/// Greeting seeded into every fresh or cleared transcript.
pub const WELCOME_MESSAGE: &str = "Hello, I am the Clinical Co-pilot. Describe the patient's \
age and symptoms and I will respond using the IMCI guidelines.";

/// Assistant reply used whenever the backend cannot be reached or answers badly.
pub const CONNECTION_ERROR_MESSAGE: &str = "⚠️ Error: Could not connect to the Clinical \
Co-pilot server. Please check that the backend is running and try again.";

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn welcome() -> Self {
        Self::assistant(WELCOME_MESSAGE)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Append-only, chronologically ordered list of turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ChatMessage>,
}

impl Transcript {
    /// A transcript holding only the seeded greeting.
    pub fn seeded() -> Self {
        Self {
            turns: vec![ChatMessage::welcome()],
        }
    }

    /// Adopt previously stored turns verbatim. Returns `None` for an empty list.
    pub fn from_turns(turns: Vec<ChatMessage>) -> Option<Self> {
        if turns.is_empty() {
            None
        } else {
            Some(Self { turns })
        }
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.turns.push(message);
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True when the transcript is exactly the seeded greeting.
    pub fn is_seeded(&self) -> bool {
        self.turns.len() == 1 && self.turns[0] == ChatMessage::welcome()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::seeded()
    }
}
