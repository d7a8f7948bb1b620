//! Core types for Relax — chat messages and per-user conversations.
//!
//! Messages follow the OpenAI chat completions format, so a conversation can be
//! sent to any compatible streaming endpoint as-is.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    #[serde(rename = "assistant")]
    Assistant { content: String },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
        }
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content } => content,
        }
    }

    /// The `role` value this message serializes with.
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
        }
    }
}

// ─────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────

/// The bounded-lifetime conversation history kept for one user.
///
/// The first message is always the system prompt. Turns are only ever appended,
/// so the history cannot be reordered or lose its system turn.
#[derive(Clone, Debug)]
pub struct Conversation {
    owner: String,
    started_at: Instant,
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a fresh conversation containing only the system turn.
    pub fn new(owner: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Conversation {
            owner: owner.into(),
            started_at: Instant::now(),
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// User identifier this conversation belongs to.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// All turns, system turn first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Time elapsed since the conversation started.
    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether the conversation has outlived the staleness window.
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    /// Append a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Total characters of content across all turns.
    pub fn content_len(&self) -> usize {
        self.messages.iter().map(|m| m.content().chars().count()).sum()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
