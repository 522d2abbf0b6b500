use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::LabelSource;

/// Cluster assignment of one text.
///
/// `-1` ([`ClusterId::NOISE`]) is the reserved "noise / outlier / small voice"
/// sentinel and is never a topic id. Topic ids are non-negative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ClusterId(pub i32);

impl ClusterId {
    pub const NOISE: Self = Self(-1);

    #[must_use]
    pub const fn is_noise(self) -> bool {
        self.0 == Self::NOISE.0
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for ClusterId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable name for one cluster id.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ClusterLabel {
    pub id: ClusterId,
    pub name: String,
    pub is_noise: bool,
    pub source: LabelSource,
    /// Number of texts assigned to this cluster.
    pub size: usize,
    /// Mean sentiment of members, present only when sentiment enrichment ran.
    pub sentiment: Option<f32>,
}

impl ClusterLabel {
    /// Fixed label for the small-voice sentinel cluster.
    #[must_use]
    pub fn reserved(name: &str, size: usize) -> Self {
        Self {
            id: ClusterId::NOISE,
            name: name.to_string(),
            is_noise: true,
            source: LabelSource::Reserved,
            size,
            sentiment: None,
        }
    }

    /// Deterministic placeholder label, `Group {id}`.
    #[must_use]
    pub fn fallback(id: ClusterId, size: usize) -> Self {
        Self {
            id,
            name: Self::placeholder_name(id),
            is_noise: false,
            source: LabelSource::Fallback,
            size,
            sentiment: None,
        }
    }

    #[must_use]
    pub fn generated(id: ClusterId, name: String, size: usize) -> Self {
        Self {
            id,
            name,
            is_noise: false,
            source: LabelSource::Generated,
            size,
            sentiment: None,
        }
    }

    #[must_use]
    pub fn placeholder_name(id: ClusterId) -> String {
        format!("Group {id}")
    }
}
