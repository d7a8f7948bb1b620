//! Configuration schema.
//!
//! Hierarchy: `Config` → `AiConfig`, `KvConfig`, `ReviewConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionSettings;

/// Default behavioral instructions for the conversational responder.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Relax, a friendly assistant living in the \
    team's chat workspace. Keep answers short, use Slack-flavoured markdown, and say so \
    when you don't know something.";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.relax/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub ai: AiConfig,
    pub kv: KvConfig,
    pub review: ReviewConfig,
}

// ─────────────────────────────────────────────
// AI
// ─────────────────────────────────────────────

/// Chat-completion backend and conversation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    /// Model identifier sent with each request.
    pub model: String,
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// Bearer token for the API.
    pub api_key: String,
    /// First turn of every conversation.
    pub system_prompt: String,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Presence penalty (-2.0 – 2.0).
    pub presence_penalty: f64,
    /// Tokens allowed on top of the history length for `max_tokens`.
    pub completion_budget: u32,
    /// Staleness window for conversations, in seconds.
    pub session_ttl_secs: u64,
    /// Minimum gap between streamed message updates, in milliseconds.
    pub stream_interval_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 1.5,
            presence_penalty: 2.0,
            completion_budget: 3000,
            session_ttl_secs: 5 * 60,
            stream_interval_ms: 1500,
        }
    }
}

impl AiConfig {
    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }

    /// Settings for spawning the session actor.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::new(self.system_prompt.clone(), self.session_ttl())
    }
}

// ─────────────────────────────────────────────
// Key-value store
// ─────────────────────────────────────────────

/// REST key-value backend holding review counts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KvConfig {
    /// Base URL of the REST endpoint.
    pub url: String,
    /// Bearer token.
    pub token: String,
    /// Prefix prepended to member ids to build count keys.
    pub key_prefix: String,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            key_prefix: "reviews:".to_string(),
        }
    }
}

impl KvConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.token.is_empty()
    }
}

// ─────────────────────────────────────────────
// Review
// ─────────────────────────────────────────────

/// Reviewer-selection settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewConfig {
    /// Members of the team that reviewers are drawn from.
    pub team: Vec<TeamMember>,
}

/// One member of the review team.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub is_bot: bool,
    pub is_restricted: bool,
}

impl TeamMember {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
