//! Relax Agent — the conversational path.
//!
//! This crate contains:
//! - **stream**: `StreamCoalescer`, which turns a fast fragment stream into
//!   infrequent cumulative snapshots and persists the finished answer
//! - **responder**: one conversational turn, from session lookup to snapshots

pub mod responder;
pub mod stream;

pub use responder::Responder;
pub use stream::{StreamCoalescer, DEFAULT_STREAM_INTERVAL};
