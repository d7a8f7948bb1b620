//! Stream coalescing — rate-limited cumulative snapshots of a streamed answer.
//!
//! Chat front-ends edit one message in place as the answer grows, and edits
//! are rate limited. The coalescer accumulates fragments silently and only
//! emits the running text when at least one interval has passed since the
//! previous emission. When the source ends it waits out the current interval,
//! emits the complete text once more, and stores it as the assistant turn.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use relax_core::session::SessionStore;
use relax_core::types::Conversation;

/// Default minimum gap between two emissions.
pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_millis(1500);

/// Throttles fragment streams and writes finished answers back to the session store.
#[derive(Clone, Debug)]
pub struct StreamCoalescer {
    store: SessionStore,
    interval: Duration,
}

impl StreamCoalescer {
    pub fn new(store: SessionStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start coalescing `fragments` for `owner`.
    ///
    /// `conversation` is the session the answer belongs to, user turn already
    /// appended. Snapshots arrive on the returned receiver, each one the full
    /// text so far; the receiver closes after the final snapshot, once the
    /// answer has been handed to the session store.
    ///
    /// A source error ends the answer early. Whatever arrived before it is
    /// still emitted and persisted. Dropping the receiver does not cancel
    /// persistence.
    pub fn coalesce<S>(
        &self,
        owner: &str,
        conversation: Conversation,
        fragments: S,
    ) -> mpsc::UnboundedReceiver<String>
    where
        S: Stream<Item = anyhow::Result<String>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let run = Coalescing {
            owner: owner.to_string(),
            conversation,
            store: self.store.clone(),
            interval: self.interval,
            snapshots: tx,
        };
        tokio::spawn(run.drive(fragments));
        rx
    }
}

/// State of one in-flight answer.
struct Coalescing {
    owner: String,
    conversation: Conversation,
    store: SessionStore,
    interval: Duration,
    snapshots: mpsc::UnboundedSender<String>,
}

impl Coalescing {
    async fn drive<S>(mut self, fragments: S)
    where
        S: Stream<Item = anyhow::Result<String>> + Send,
    {
        tokio::pin!(fragments);

        let mut accumulated = String::new();
        let mut last_emit = Instant::now();
        // Length of the last emitted snapshot; snapshots only ever grow.
        let mut emitted: Option<usize> = None;
        let mut pieces = 0usize;

        loop {
            match fragments.next().await {
                Some(Ok(fragment)) => {
                    pieces += 1;
                    accumulated.push_str(&fragment);
                    if last_emit.elapsed() > self.interval {
                        self.emit(&accumulated);
                        emitted = Some(accumulated.len());
                        last_emit = Instant::now();
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        owner = %self.owner,
                        error = %e,
                        received = accumulated.len(),
                        "completion stream broke off, keeping partial answer"
                    );
                    break;
                }
                None => break,
            }
        }

        if emitted != Some(accumulated.len()) {
            let remaining = self.interval.saturating_sub(last_emit.elapsed());
            tokio::time::sleep(remaining).await;
            self.emit(&accumulated);
        }

        debug!(
            owner = %self.owner,
            fragments = pieces,
            chars = accumulated.chars().count(),
            "answer complete"
        );

        self.conversation.push_assistant(accumulated);
        self.store.set(&self.owner, self.conversation);
        // `snapshots` drops here, closing the receiver after the store write is queued.
    }

    fn emit(&self, snapshot: &str) {
        // Nobody listening any more; keep going so the answer is still stored.
        let _ = self.snapshots.send(snapshot.to_string());
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use relax_core::session::{SessionSettings, DEFAULT_SESSION_TTL};
    use relax_core::types::Message;

    fn make_store() -> SessionStore {
        SessionStore::spawn(SessionSettings::new("You are Relax.", DEFAULT_SESSION_TTL))
    }

    /// Fragments that each arrive after the given delay in milliseconds.
    fn timed(
        parts: Vec<(u64, &'static str)>,
    ) -> impl Stream<Item = anyhow::Result<String>> + Send + 'static {
        stream::iter(parts).then(|(delay_ms, text)| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(text.to_string())
        })
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(snapshot) = rx.recv().await {
            out.push(snapshot);
        }
        out
    }

    async fn conversation_for(store: &SessionStore, owner: &str, text: &str) -> Conversation {
        let mut conversation = store.get(owner).await;
        conversation.push_user(text);
        conversation
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_stream_emits_once_after_interval() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "hi").await;

        let start = Instant::now();
        let fragments = timed(vec![(0, "a"), (0, "b"), (0, "c")]);
        let rx = coalescer.coalesce("U1", conversation, fragments);
        let snapshots = drain(rx).await;

        assert_eq!(snapshots, vec!["abc"]);
        assert!(start.elapsed() >= DEFAULT_STREAM_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stream_emits_every_fragment_without_duplicate() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "hi").await;

        let rx = coalescer.coalesce(
            "U1",
            conversation,
            timed(vec![(2000, "a"), (2000, "b"), (2000, "c")]),
        );
        let snapshots = drain(rx).await;

        assert_eq!(snapshots, vec!["a", "ab", "abc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emissions_respect_minimum_gap() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "hi").await;

        // One fragment every 400ms for 4 seconds.
        let parts: Vec<(u64, &'static str)> = (0..10).map(|_| (400, "x")).collect();
        let mut rx = coalescer.coalesce("U1", conversation, timed(parts));

        let mut stamps = Vec::new();
        let mut last = String::new();
        while let Some(snapshot) = rx.recv().await {
            assert!(snapshot.starts_with(&last));
            last = snapshot;
            stamps.push(Instant::now());
        }

        assert_eq!(last, "x".repeat(10));
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_STREAM_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_answer_is_persisted() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "what's up?").await;

        let fragments = timed(vec![(10, "not "), (10, "much")]);
        let rx = coalescer.coalesce("U1", conversation, fragments);
        drain(rx).await;

        let stored = store.get("U1").await;
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.messages()[1], Message::user("what's up?"));
        assert_eq!(stored.messages()[2], Message::assistant("not much"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_error_keeps_partial_answer() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "tell me").await;

        let fragments = stream::iter(vec![
            Ok("par".to_string()),
            Ok("tial".to_string()),
            Err(anyhow::anyhow!("connection reset")),
            Ok("never seen".to_string()),
        ]);
        let snapshots = drain(coalescer.coalesce("U1", conversation, fragments)).await;

        assert_eq!(snapshots, vec!["partial"]);
        let stored = store.get("U1").await;
        assert_eq!(stored.messages().last(), Some(&Message::assistant("partial")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_stream_still_emits_once() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "hello?").await;

        let fragments = stream::empty::<anyhow::Result<String>>();
        let snapshots = drain(coalescer.coalesce("U1", conversation, fragments)).await;

        assert_eq!(snapshots, vec![""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_still_persists() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "ping").await;

        let rx = coalescer.coalesce("U1", conversation, timed(vec![(100, "pong")]));
        drop(rx);

        // Long enough for the tail wait and the store write.
        tokio::time::sleep(Duration::from_secs(5)).await;

        let stored = store.get("U1").await;
        assert_eq!(stored.messages().last(), Some(&Message::assistant("pong")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tail_waits_only_for_remaining_interval() {
        let store = make_store();
        let coalescer = StreamCoalescer::new(store.clone(), DEFAULT_STREAM_INTERVAL);
        let conversation = conversation_for(&store, "U1", "hi").await;

        // "a" is emitted at 2s, "b" arrives at 3s, the tail fires at 3.5s.
        let start = Instant::now();
        let fragments = timed(vec![(2000, "a"), (1000, "b")]);
        let mut rx = coalescer.coalesce("U1", conversation, fragments);

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("ab"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3500));
        assert!(elapsed < Duration::from_millis(3600));
        assert_eq!(rx.recv().await, None);
    }
}
