//! Error types for koe-analysis.
//!
//! Only [`AnalysisError`] escapes the public entry points. [`ClusterError`]
//! and [`ProjectionError`] are internal failures that the engine and the
//! projector turn into fallbacks.

use koe_core::errors::CoreError;

/// Errors that abort an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The request failed validation (blank text, misaligned timestamps).
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    /// A CPU-bound stage panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A stage produced a different number of rows than it was given.
    #[error("{what} produced {actual} rows, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Failures of the density clustering branch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("need at least {required} points, got {actual}")]
    TooFewPoints { required: usize, actual: usize },

    #[error("distance matrix contains non-finite values")]
    NonFinite,
}

/// Failures of the neighbor-graph layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("layout needs at least {required} points, got {actual}")]
    TooFewPoints { required: usize, actual: usize },

    #[error("layout produced non-finite coordinates")]
    NonFinite,
}
