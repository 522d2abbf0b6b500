//! Provider error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when calling a language model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The provider returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Response text could not be turned into the expected structure.
    #[error("parse error: {0}")]
    Parse(String),

    /// The call did not finish within the configured timeout.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// No provider is configured (offline mode, missing API key).
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered but produced no text (safety block, empty candidate list).
    #[error("empty response: {0}")]
    EmptyResponse(String),
}
