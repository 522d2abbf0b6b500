//! Cluster naming settings.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ensure};

/// Generic numbered names ("Category 1", "Group 3", "グループ2", ...). The
/// `Group {id}` fallback for unnamed topics is one of them.
static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(category|group|cluster|topic|theme|カテゴリー?|グループ|クラスター?|トピック)\s*[#:：_-]?\s*[0-9０-９]+$",
    )
    .ok()
});

/// Whether `name` is a numbered placeholder rather than a real topic name.
#[must_use]
pub fn is_placeholder_label(name: &str) -> bool {
    PLACEHOLDER
        .as_ref()
        .is_some_and(|re| re.is_match(name.trim()))
}

const fn default_batch_size() -> usize {
    5
}

const fn default_max_workers() -> usize {
    3
}

const fn default_samples_per_cluster() -> usize {
    5
}

const fn default_max_label_chars() -> usize {
    15
}

fn default_small_voice_label() -> String {
    "Small Voice".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamingConfig {
    /// Cluster ids per naming prompt.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Naming prompts in flight at once.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Representative texts per cluster, closest to the centroid first.
    #[serde(default = "default_samples_per_cluster")]
    pub samples_per_cluster: usize,

    /// Longest accepted label, in characters.
    #[serde(default = "default_max_label_chars")]
    pub max_label_chars: usize,

    /// Reserved label of cluster -1.
    #[serde(default = "default_small_voice_label")]
    pub small_voice_label: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            samples_per_cluster: default_samples_per_cluster(),
            max_label_chars: default_max_label_chars(),
            small_voice_label: default_small_voice_label(),
        }
    }
}

impl NamingConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.batch_size >= 1, "naming.batch_size", "must be at least 1")?;
        ensure(
            (1..=3).contains(&self.max_workers),
            "naming.max_workers",
            "must be within 1..=3",
        )?;
        ensure(
            self.samples_per_cluster >= 1,
            "naming.samples_per_cluster",
            "must be at least 1",
        )?;
        ensure(
            self.max_label_chars >= 1,
            "naming.max_label_chars",
            "must be at least 1",
        )?;
        ensure(
            !self.small_voice_label.trim().is_empty(),
            "naming.small_voice_label",
            "must not be empty",
        )?;
        ensure(
            !is_placeholder_label(&self.small_voice_label),
            "naming.small_voice_label",
            "must not look like a numbered topic name such as `Group 0`",
        )
    }
}
