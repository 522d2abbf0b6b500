//! # koe-llm
//!
//! Language model access for koe.
//!
//! - [`TextGenerator`]: the narrow `generate(prompt) -> text` seam every
//!   LLM-backed component depends on
//! - [`GeminiClient`]: Gemini REST implementation of [`TextGenerator`] and of
//!   [`koe_embeddings::EmbeddingProvider`]
//! - [`parse`]: defensive JSON extraction from model output
//! - [`generate_with_timeout`]: one attempt, bounded in time

pub mod gemini;
pub mod parse;

mod error;
mod http;

use std::time::Duration;

use async_trait::async_trait;

pub use error::LlmError;
pub use gemini::GeminiClient;

/// A generative text model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model name, for logs.
    fn name(&self) -> &str;

    /// Produce a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Generator used when no provider is available (offline mode, no API key).
/// Every call fails with [`LlmError::Unavailable`], so callers take their
/// fallback path.
#[derive(Debug, Clone)]
pub struct DisabledGenerator {
    reason: String,
}

impl DisabledGenerator {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Unavailable(self.reason.clone()))
    }
}

/// Run one `generate` call, failing with [`LlmError::Timeout`] after `timeout`.
///
/// # Errors
///
/// Returns the generator's error, or [`LlmError::Timeout`].
pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<String, LlmError> {
    tokio::time::timeout(timeout, generator.generate(prompt))
        .await
        .map_err(|_| LlmError::Timeout(timeout))?
}
