//! Completion service access.
//!
//! The query and answer stages only need "prompt in, text out", expressed by
//! [`CompletionService`]. [`CompletionClient`] implements it against an
//! OpenAI-compatible chat-completions endpoint.

pub mod client;
pub mod config;

use crate::error::InsightResult;

pub use client::CompletionClient;
pub use config::CompletionConfig;

/// A text-completion backend.
///
/// Implementations return the reply text untouched. Any failure is reported as
/// [`crate::error::InsightError::Synthesis`].
pub trait CompletionService: Send + Sync {
    fn complete(&self, prompt: &str) -> impl Future<Output = InsightResult<String>> + Send;
}
