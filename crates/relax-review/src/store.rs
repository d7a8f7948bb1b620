//! Review-count storage.
//!
//! Counts only ever grow, one `increment` per assignment. Reads are not
//! transactional with increments: two selections running at once may both
//! see the same counts, which skews their odds a little but never loses an
//! increment.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Failures talking to a count backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("count store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("count store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("count store answered with an unexpected payload: {0}")]
    Payload(String),

    #[error("count store not configured: {0}")]
    NotConfigured(&'static str),
}

/// Where selection counts live.
#[async_trait]
pub trait CountStore: Send + Sync {
    /// Count for one member; unknown members have 0.
    async fn get(&self, id: &str) -> Result<u64, StoreError>;

    /// Counts for many members, aligned by position with `ids`.
    async fn get_all(&self, ids: &[String]) -> Result<Vec<u64>, StoreError>;

    /// Atomically add one and return the new count.
    async fn increment(&self, id: &str) -> Result<u64, StoreError>;
}

/// Process-local count store, used for tests and when no backend is configured.
#[derive(Debug, Default)]
pub struct MemoryCountStore {
    counts: Mutex<HashMap<String, u64>>,
}

impl MemoryCountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with known counts.
    pub fn with_counts<I, K>(counts: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self {
            counts: Mutex::new(counts.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

#[async_trait]
impl CountStore for MemoryCountStore {
    async fn get(&self, id: &str) -> Result<u64, StoreError> {
        Ok(self.counts.lock().await.get(id).copied().unwrap_or(0))
    }

    async fn get_all(&self, ids: &[String]) -> Result<Vec<u64>, StoreError> {
        let counts = self.counts.lock().await;
        Ok(ids
            .iter()
            .map(|id| counts.get(id).copied().unwrap_or(0))
            .collect())
    }

    async fn increment(&self, id: &str) -> Result<u64, StoreError> {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
