//! Embedding error types.

use std::time::Duration;

/// Errors that can occur during embedding generation.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Model initialization failed (download, ONNX runtime, cache issues).
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    /// Embedding generation failed (inference error, provider error, invalid input).
    #[error("Embedding generation failed: {0}")]
    EmbedFailed(String),

    /// Provider returned a different number of vectors than texts sent.
    #[error("Provider returned {actual} vectors for {expected} texts")]
    RowCount { expected: usize, actual: usize },

    /// Vectors within one run have different lengths.
    #[error("Inconsistent embedding dimension: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// Provider call did not finish in time.
    #[error("Embedding call timed out after {0:?}")]
    Timeout(Duration),

    /// Model returned zero embeddings for a non-empty input.
    #[error("Empty result from embedding model")]
    EmptyResult,

    /// Lexical vectorizer found no n-grams in any text.
    #[error("Empty vocabulary: no character n-grams in input")]
    EmptyVocabulary,
}
