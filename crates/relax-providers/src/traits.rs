//! LLM Provider trait — the streaming token source behind the conversational path.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use relax_core::config::schema::AiConfig;
use relax_core::types::Message;

/// Incremental text fragments of one completion.
///
/// The stream ends on a clean finish; an `Err` item means the source broke
/// off mid-answer.
pub type FragmentStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// Sampling parameters passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Presence penalty (-2.0 – 2.0).
    pub presence_penalty: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 3000,
            temperature: 1.5,
            presence_penalty: 2.0,
        }
    }
}

impl LlmRequestConfig {
    /// Parameters for a request carrying `history_len` characters of history.
    ///
    /// The token budget grows with the conversation so long threads are not
    /// cut short.
    pub fn for_history(ai: &AiConfig, history_len: usize) -> Self {
        let history = u32::try_from(history_len).unwrap_or(u32::MAX);
        Self {
            max_tokens: history.saturating_add(ai.completion_budget),
            temperature: ai.temperature,
            presence_penalty: ai.presence_penalty,
        }
    }
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Start a streamed chat completion.
    ///
    /// # Arguments
    /// * `messages` — Conversation history in OpenAI format.
    /// * `user`     — End-user identifier forwarded for abuse monitoring.
    /// * `config`   — Temperature, max_tokens, etc.
    ///
    /// Errors here mean the request never started; failures after the first
    /// fragment surface as `Err` items inside the stream.
    async fn chat_stream(
        &self,
        messages: &[Message],
        user: &str,
        config: &LlmRequestConfig,
    ) -> anyhow::Result<FragmentStream>;

    /// Model used for requests.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
