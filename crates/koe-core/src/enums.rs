//! Urgency, provenance, method, and stage enums for koe.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for logging and display.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// Urgency of a discussion agenda item.
///
/// Ordered `unspecified < low < medium < high`. Values the model invents
/// outside this set deserialize to [`Urgency::Unspecified`] rather than
/// failing the whole agenda.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Unspecified,
    Low,
    Medium,
    High,
}

impl Urgency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse case-insensitively, mapping unknown strings to `Unspecified`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" | "mid" | "moderate" => Self::Medium,
            "high" | "urgent" | "critical" => Self::High,
            _ => Self::Unspecified,
        }
    }
}

impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Unspecified, Self::parse_lenient))
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IssueSource
// ---------------------------------------------------------------------------

/// Which group of opinions an agenda item was drawn from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    #[default]
    Majority,
    SmallVoice,
}

impl IssueSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Majority => "majority",
            Self::SmallVoice => "small_voice",
        }
    }
}

impl fmt::Display for IssueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LabelSource
// ---------------------------------------------------------------------------

/// Provenance of a cluster label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Name produced by the language model and accepted by the post-filter.
    Generated,
    /// Deterministic placeholder (`Group {id}`) after a failed or rejected name.
    Fallback,
    /// The fixed label of the small-voice sentinel cluster.
    Reserved,
}

impl LabelSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Fallback => "fallback",
            Self::Reserved => "reserved",
        }
    }
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ClusterMethod
// ---------------------------------------------------------------------------

/// Which branch of the cluster engine produced the final assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum ClusterMethod {
    /// Density clustering succeeded with at least two topic clusters.
    Density,
    /// k-means partition with the chosen cluster count.
    Partition { k: usize },
    /// Too few points to model; everything is cluster 0.
    Trivial,
}

impl ClusterMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Density => "density",
            Self::Partition { .. } => "partition",
            Self::Trivial => "trivial",
        }
    }
}

impl fmt::Display for ClusterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partition { k } => write!(f, "partition(k={k})"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline stage that recorded a degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Embedding,
    Outliers,
    Clustering,
    Projection,
    Naming,
    Sentiment,
    Issues,
    Summary,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Outliers => "outliers",
            Self::Clustering => "clustering",
            Self::Projection => "projection",
            Self::Naming => "naming",
            Self::Sentiment => "sentiment",
            Self::Issues => "issues",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
