//! UI-agnostic conversation state
//!
//! This module contains the message model and the conversation store shared by
//! every front end. It doesn't depend on any UI framework or on the network.

use serde::{Deserialize, Serialize};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Usage metadata the dialogue service attaches to a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMeta {
    pub processed_input: String,
    pub tokens_used: u64,
}

impl MessageMeta {
    /// One-line summary shown under a reply, e.g. `2 words, 1 sentences · 12 tokens`
    pub fn summary(&self) -> String {
        if self.processed_input.is_empty() {
            format!("{} tokens", self.tokens_used)
        } else {
            format!("{} · {} tokens", self.processed_input, self.tokens_used)
        }
    }
}

/// A chat message in the tutoring conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MessageMeta>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            meta: None,
        }
    }

    pub fn assistant(content: impl Into<String>, meta: Option<MessageMeta>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            meta,
        }
    }

    /// Tokens this message contributes to the running total
    pub fn tokens_used(&self) -> u64 {
        match (self.role, &self.meta) {
            (ChatRole::Assistant, Some(meta)) => meta.tokens_used,
            _ => 0,
        }
    }

    /// Role/content projection sent back to the service as history
    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// One entry of `conversation_history` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

/// Ordered message history plus the aggregate token count.
///
/// `append` is the only way history grows, so `total_tokens` always equals the
/// sum of `tokens_used` over the assistant messages held here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    messages: Vec<ChatMessage>,
    total_tokens: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.total_tokens = self.total_tokens.saturating_add(message.tokens_used());
        self.messages.push(message);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(ChatMessage::to_history).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
