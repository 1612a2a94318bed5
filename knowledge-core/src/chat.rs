//! Chat history value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message author role
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

/// One chat-history entry as persisted in the game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// Set on dice submissions and on operator-visible dice diagnostics
    #[serde(default)]
    pub is_dice_result: bool,
    /// The raw structured response the model emitted, kept so the next turn
    /// sees its own tool call instead of the rendered narrative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response_json: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            is_dice_result: false,
            ai_response_json: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Operator-visible diagnostic appended after a failed AI turn. The
    /// prompt assembler filters these out of every future prompt.
    pub fn system_error(reason: impl std::fmt::Display) -> Self {
        let mut msg = Self::new(Role::System, format!("(Error: {reason})"));
        msg.is_dice_result = true;
        msg
    }

    /// Whether this message is an operator diagnostic that must never reach
    /// the AI
    pub fn is_error_diagnostic(&self) -> bool {
        self.role == Role::System
            && self.is_dice_result
            && self.content.trim_start().starts_with("(Error")
    }
}

/// A message in the assembled prompt, ready for the AI client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_error_is_flagged_as_diagnostic() {
        let msg = ChatMessage::system_error("parse failed");
        assert_eq!(msg.content, "(Error: parse failed)");
        assert!(msg.is_error_diagnostic());
    }

    #[test]
    fn ordinary_system_message_is_not_a_diagnostic() {
        let msg = ChatMessage::new(Role::System, "The session begins.");
        assert!(!msg.is_error_diagnostic());

        // Dice results that are not errors stay visible
        let mut dice = ChatMessage::new(Role::System, "Rolled 17 on 1d20");
        dice.is_dice_result = true;
        assert!(!dice.is_error_diagnostic());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
