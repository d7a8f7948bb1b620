//! Per-user conversation sessions.
//!
//! A single worker task owns the session map; every `get` / `set` is a request
//! queued to that worker and handled in arrival order. Callers hold a cheap,
//! cloneable [`SessionStore`] handle and never take a lock themselves.

pub mod store;

pub use store::{SessionSettings, SessionStore, DEFAULT_SESSION_TTL};
