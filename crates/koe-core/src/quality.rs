//! Explicit fallback grading.
//!
//! Every component with a fallback path returns [`Graded<T>`]: the value it
//! produced plus a [`Quality`] that says whether the value came from the
//! healthy path or from a fallback. The pipeline collects degraded qualities
//! into [`Degradation`] entries on the final report.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Stage;

/// Whether a value was produced by the primary path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Quality {
    #[default]
    Healthy,
    Degraded { reason: String },
}

impl Quality {
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The degradation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Healthy => None,
            Self::Degraded { reason } => Some(reason),
        }
    }
}

/// A value paired with the quality of the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graded<T> {
    pub value: T,
    pub quality: Quality,
}

impl<T> Graded<T> {
    pub const fn healthy(value: T) -> Self {
        Self {
            value,
            quality: Quality::Healthy,
        }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            quality: Quality::Degraded {
                reason: reason.into(),
            },
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.quality.is_degraded()
    }

    /// Transform the value, keeping the quality.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Graded<U> {
        Graded {
            value: f(self.value),
            quality: self.quality,
        }
    }

    /// Split into the value and, when degraded, a [`Degradation`] for `stage`.
    pub fn into_parts(self, stage: Stage) -> (T, Option<Degradation>) {
        let degradation = match self.quality {
            Quality::Healthy => None,
            Quality::Degraded { reason } => Some(Degradation { stage, reason }),
        };
        (self.value, degradation)
    }
}

/// A fallback taken by one pipeline stage during an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Degradation {
    pub stage: Stage,
    pub reason: String,
}
