//! Cross-cutting error types for koe.
//!
//! Provider-side failures never show up here: those are absorbed by each
//! component and reported through [`crate::quality::Graded`]. These errors
//! describe malformed inputs that indicate a bug in the caller.

use thiserror::Error;

/// Errors that can be raised by any koe crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation (blank text, mismatched parallel lists).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two collections that must be index-aligned have different lengths.
    #[error("Length mismatch: {what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
