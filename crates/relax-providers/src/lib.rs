//! LLM provider layer for Relax.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait for any backend that can stream a chat completion
//! - [`http_provider::HttpProvider`] — OpenAI-compatible client over server-sent events
//! - [`sse`] — turns a raw SSE byte stream into text fragments

pub mod http_provider;
pub mod sse;
pub mod traits;

// Re-export main types for convenience
pub use http_provider::HttpProvider;
pub use traits::{FragmentStream, LlmProvider, LlmRequestConfig};
