//! Relax core — shared types, the session actor, configuration, and path helpers.
//!
//! - [`types`] — chat messages in the OpenAI role-tagged format and [`types::Conversation`]
//! - [`session`] — [`session::SessionStore`], the single-writer conversation store
//! - [`config`] — JSON config file + `RELAX_*` env overrides

pub mod config;
pub mod session;
pub mod types;
pub mod utils;

pub use session::{SessionSettings, SessionStore};
pub use types::{Conversation, Message};
