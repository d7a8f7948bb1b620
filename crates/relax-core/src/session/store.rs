//! Session actor — single-writer conversation store with a staleness window.
//!
//! Requests travel over an unbounded mpsc queue to one worker task. `get`
//! replies through a oneshot channel; `set` is fire-and-forget but still
//! ordered behind every request queued before it, so a caller that does
//! `get` → mutate → `set` is last-write-wins per owner.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::types::Conversation;

/// Default staleness window: 5 minutes.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(5 * 60);

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// How fresh sessions are initialized and when they expire.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Fixed behavioral instructions used as every session's first turn.
    pub system_prompt: String,
    /// Maximum age of a session before it is treated as expired.
    pub ttl: Duration,
}

impl SessionSettings {
    pub fn new(system_prompt: impl Into<String>, ttl: Duration) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            ttl,
        }
    }

    fn fresh(&self, owner: &str) -> Conversation {
        Conversation::new(owner, self.system_prompt.clone())
    }
}

// ─────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────

enum Request {
    Get {
        owner: String,
        reply: oneshot::Sender<Conversation>,
    },
    Set {
        owner: String,
        conversation: Conversation,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
}

// ─────────────────────────────────────────────
// SessionStore (handle)
// ─────────────────────────────────────────────

/// Handle to the session actor. Clone freely; all clones talk to the same worker.
///
/// The worker stops once every handle has been dropped.
#[derive(Clone)]
pub struct SessionStore {
    requests: mpsc::UnboundedSender<Request>,
    settings: Arc<SessionSettings>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.settings.ttl)
            .finish()
    }
}

impl SessionStore {
    /// Spawn the worker on the current tokio runtime and return a handle to it.
    pub fn spawn(settings: SessionSettings) -> Self {
        let settings = Arc::new(settings);
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = SessionWorker {
            sessions: HashMap::new(),
            settings: settings.clone(),
            requests: rx,
        };
        tokio::spawn(worker.run());

        SessionStore {
            requests: tx,
            settings,
        }
    }

    /// Current session for `owner`.
    ///
    /// Unknown or stale owners get a fresh session (system turn only). The fresh
    /// session is not stored; call [`SessionStore::set`] to keep it.
    pub async fn get(&self, owner: &str) -> Conversation {
        let (reply, rx) = oneshot::channel();
        let request = Request::Get {
            owner: owner.to_string(),
            reply,
        };

        if self.requests.send(request).is_err() {
            error!(owner = %owner, "session worker is gone, handing out a fresh session");
            return self.settings.fresh(owner);
        }

        match rx.await {
            Ok(conversation) => conversation,
            Err(_) => {
                error!(owner = %owner, "session worker dropped a get request");
                self.settings.fresh(owner)
            }
        }
    }

    /// Replace the stored session for `owner` unconditionally.
    pub fn set(&self, owner: &str, conversation: Conversation) {
        let request = Request::Set {
            owner: owner.to_string(),
            conversation,
        };
        if self.requests.send(request).is_err() {
            error!(owner = %owner, "session worker is gone, dropping session update");
        }
    }

    /// Reset `owner` to a fresh session (forced expiry).
    pub fn clear_history(&self, owner: &str) {
        debug!(owner = %owner, "clearing conversation history");
        self.set(owner, self.settings.fresh(owner));
    }

    /// Number of owners with a stored entry, stale ones included.
    pub async fn len(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(Request::Len { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// ─────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────

/// Sole owner of the session map.
struct SessionWorker {
    sessions: HashMap<String, Conversation>,
    settings: Arc<SessionSettings>,
    requests: mpsc::UnboundedReceiver<Request>,
}

impl SessionWorker {
    async fn run(mut self) {
        debug!(ttl_s = self.settings.ttl.as_secs(), "session worker started");

        while let Some(request) = self.requests.recv().await {
            match request {
                Request::Get { owner, reply } => {
                    let conversation = self.lookup(&owner);
                    // The caller may have given up waiting; that is not our problem.
                    let _ = reply.send(conversation);
                }
                Request::Set {
                    owner,
                    conversation,
                } => {
                    trace!(owner = %owner, turns = conversation.len(), "storing session");
                    self.sessions.insert(owner, conversation);
                }
                Request::Len { reply } => {
                    let _ = reply.send(self.sessions.len());
                }
            }
        }

        debug!(sessions = self.sessions.len(), "session worker stopped");
    }

    fn lookup(&self, owner: &str) -> Conversation {
        match self.sessions.get(owner) {
            Some(existing) if !existing.is_stale(self.settings.ttl) => existing.clone(),
            Some(_) => {
                debug!(owner = %owner, "session expired, starting over");
                self.settings.fresh(owner)
            }
            None => self.settings.fresh(owner),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
