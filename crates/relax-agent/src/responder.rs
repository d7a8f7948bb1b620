//! Responder — one conversational turn.
//!
//! 1. Fetch the owner's session (fresh if unknown or expired)
//! 2. Append the user's message
//! 3. Open a completion stream over the whole conversation
//! 4. Hand the stream to the coalescer, which emits snapshots and stores the answer

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use relax_core::config::schema::AiConfig;
use relax_core::session::SessionStore;
use relax_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::stream::StreamCoalescer;

/// Wires the session store, an LLM provider and the coalescer together.
pub struct Responder {
    sessions: SessionStore,
    provider: Arc<dyn LlmProvider>,
    coalescer: StreamCoalescer,
    ai: AiConfig,
}

impl Responder {
    pub fn new(sessions: SessionStore, provider: Arc<dyn LlmProvider>, ai: AiConfig) -> Self {
        let coalescer = StreamCoalescer::new(sessions.clone(), ai.stream_interval());

        info!(
            model = provider.model(),
            provider = provider.display_name(),
            interval_ms = coalescer.interval().as_millis() as u64,
            "responder ready"
        );

        Self {
            sessions,
            provider,
            coalescer,
            ai,
        }
    }

    /// Answer `text` from `owner`.
    ///
    /// Returns the snapshot receiver; the last snapshot is the full answer.
    /// Fails only if the completion could not be started, in which case the
    /// session is left untouched.
    pub async fn respond(
        &self,
        owner: &str,
        text: &str,
    ) -> Result<mpsc::UnboundedReceiver<String>> {
        let mut conversation = self.sessions.get(owner).await;
        conversation.push_user(text);

        let config = LlmRequestConfig::for_history(&self.ai, conversation.content_len());
        debug!(
            owner = %owner,
            turns = conversation.len(),
            max_tokens = config.max_tokens,
            "requesting completion"
        );

        let fragments = self
            .provider
            .chat_stream(conversation.messages(), owner, &config)
            .await?;

        Ok(self.coalescer.coalesce(owner, conversation, fragments))
    }

    /// Answer `text` and wait for the final snapshot.
    pub async fn respond_full(&self, owner: &str, text: &str) -> Result<String> {
        let mut snapshots = self.respond(owner, text).await?;
        let mut last = String::new();
        while let Some(snapshot) = snapshots.recv().await {
            last = snapshot;
        }
        Ok(last)
    }

    /// Forget everything `owner` said so far.
    pub fn clear_history(&self, owner: &str) {
        self.sessions.clear_history(owner);
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        self.provider.model()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
