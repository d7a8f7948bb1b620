//! Count store backed by an Upstash-style REST key-value service.
//!
//! Each command is POSTed as a JSON array (`["INCR", "reviews:U1"]`) to the
//! base URL; batches go to `<url>/pipeline` as an array of such arrays. Every
//! answer is wrapped as `{"result": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use relax_core::config::schema::KvConfig;

use crate::store::{CountStore, StoreError};

#[derive(Debug, Deserialize)]
struct KvPacket {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl KvPacket {
    fn into_result(self) -> Result<Value, StoreError> {
        match self.error {
            Some(message) => Err(StoreError::Payload(message)),
            None => Ok(self.result),
        }
    }
}

/// REST client for review counts.
pub struct KvStore {
    client: reqwest::Client,
    url: String,
    token: String,
    key_prefix: String,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("url", &self.url)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl KvStore {
    /// Create a store from the `kv` config section.
    pub fn new(config: &KvConfig) -> Result<Self, StoreError> {
        if config.url.is_empty() {
            return Err(StoreError::NotConfigured("kv.url is empty"));
        }
        if config.token.is_empty() {
            return Err(StoreError::NotConfigured("kv.token is empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Storage key for a member's count.
    fn key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    async fn post(&self, url: String, body: Value) -> Result<reqwest::Response, StoreError> {
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %body, "count store error");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Run a single command.
    async fn command(&self, command: Value) -> Result<Value, StoreError> {
        debug!(command = %command, "kv command");
        let packet: KvPacket = self.post(self.url.clone(), command).await?.json().await?;
        packet.into_result()
    }

    /// Run several commands in one round trip; results keep command order.
    async fn pipeline(&self, commands: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let expected = commands.len();
        debug!(commands = expected, "kv pipeline");

        let url = format!("{}/pipeline", self.url);
        let packets: Vec<KvPacket> = self.post(url, Value::Array(commands)).await?.json().await?;

        if packets.len() != expected {
            return Err(StoreError::Payload(format!(
                "pipeline returned {} results for {} commands",
                packets.len(),
                expected
            )));
        }

        packets.into_iter().map(KvPacket::into_result).collect()
    }
}

/// Interpret a stored value as a count. Missing keys read as 0.
fn parse_count(value: &Value) -> Result<u64, StoreError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| StoreError::Payload(format!("not a count: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| StoreError::Payload(format!("not a count: {:?}", s))),
        other => Err(StoreError::Payload(format!("not a count: {}", other))),
    }
}

#[async_trait]
impl CountStore for KvStore {
    async fn get(&self, id: &str) -> Result<u64, StoreError> {
        let value = self.command(json!(["GET", self.key(id)])).await?;
        parse_count(&value)
    }

    async fn get_all(&self, ids: &[String]) -> Result<Vec<u64>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let commands = ids.iter().map(|id| json!(["GET", self.key(id)])).collect();
        self.pipeline(commands)
            .await?
            .iter()
            .map(parse_count)
            .collect()
    }

    async fn increment(&self, id: &str) -> Result<u64, StoreError> {
        let value = self.command(json!(["INCR", self.key(id)])).await?;
        parse_count(&value)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
