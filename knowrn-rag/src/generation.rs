//! Text generation capability used for answers and relevance scoring.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a prompt into text.
///
/// Transport failures and non-success responses are reported as
/// [`RagError::GenerationError`](crate::RagError::GenerationError).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
