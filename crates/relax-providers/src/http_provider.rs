//! HTTP provider for OpenAI-compatible streaming chat completions.
//!
//! Posts the whole conversation to `/chat/completions` with `stream: true`
//! and hands the event stream to [`crate::sse::fragments`].

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use relax_core::config::schema::AiConfig;
use relax_core::types::Message;

use crate::sse;
use crate::traits::{FragmentStream, LlmProvider, LlmRequestConfig};

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f64,
    presence_penalty: f64,
    user: &'a str,
    stream: bool,
}

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// Streaming client for any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    model: String,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl HttpProvider {
    /// Create a provider from the `ai` config section.
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        // No overall timeout: long answers keep the body open for minutes.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpProvider {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        user: &str,
        config: &LlmRequestConfig,
    ) -> anyhow::Result<FragmentStream> {
        debug!(
            model = %self.model,
            messages = messages.len(),
            max_tokens = config.max_tokens,
            user = user,
            "Starting completion stream"
        );

        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            presence_penalty: config.presence_penalty,
            user,
            stream: true,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                anyhow::anyhow!("Error calling LLM: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %error_text, "API error");
            anyhow::bail!("Error calling LLM: {} — {}", status, error_text);
        }

        Ok(sse::fragments(response.bytes_stream()))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
