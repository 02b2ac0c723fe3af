//! Conversation types passed in by the caller.

use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction to the model.
    System,
    /// The dashboard user.
    User,
    /// The model.
    Assistant,
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who wrote it.
    pub role: Role,
    /// Plain text content.
    pub content: String,
}

impl ChatTurn {
    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything needed for one chat-send operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    /// System instruction, sent first when present.
    pub system: Option<String>,
    /// Prior turns in conversation order.
    pub history: Vec<ChatTurn>,
    /// The newest user message.
    pub user_text: String,
}

impl ChatRequest {
    /// A request with no history and no system instruction.
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            ..Default::default()
        }
    }

    /// Set the system instruction.
    #[must_use]
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the prior turns.
    #[must_use]
    pub fn history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}
