//! All AI/LLM functionality

use async_trait::async_trait;

use crate::core::models::Content;
use crate::errors::ScribeError;

pub mod client;

// Re-export main types for convenience
pub use client::{LlmClient, estimate_tokens};

/// Everything the summarizer gets for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub group_key: String,
    pub time_range: String,
    pub message_count: usize,
    pub contents: Vec<Content>,
}

/// Turns an ordered conversation into summary text.
///
/// Returning [`crate::prompt::NO_UPDATE_SENTINEL`] (or blank text) means there
/// was nothing worth summarizing.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, ScribeError>;
}
