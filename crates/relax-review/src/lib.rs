//! Relax Review — picking code reviewers fairly.
//!
//! # Architecture
//!
//! - [`weighted`] — weighted random choice over positive integer weights
//! - [`store`] — `CountStore` trait (how often each member was picked) + in-memory store
//! - [`kv`] — `CountStore` backed by an Upstash-style REST key-value service
//! - [`selector`] — fairness weights, selection, odds and reviewer profiles
//! - [`workflow`] — outcome reported back to the workflow engine

pub mod kv;
pub mod selector;
pub mod store;
pub mod weighted;
pub mod workflow;

pub use kv::KvStore;
pub use selector::{Candidate, FairnessSelector, Odds, ReviewerProfile, SelectionError};
pub use store::{CountStore, MemoryCountStore, StoreError};
pub use weighted::{WeightError, Weighted};
pub use workflow::WorkflowOutcome;
