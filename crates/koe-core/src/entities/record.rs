use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ClusterId, ClusterLabel, IssueAgendaItem};
use crate::enums::ClusterMethod;
use crate::quality::Degradation;

/// Per-text analysis result, emitted in input order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnalysisRecord {
    pub original_text: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Name of the assigned cluster.
    pub sub_topic: String,
    /// Truncated original text.
    pub summary: String,
    pub x: f32,
    pub y: f32,
    pub cluster_id: ClusterId,
    pub is_noise: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f32>,
}

/// Full output of one analysis run.
///
/// `degradations` lists every fallback a stage took; an empty list means the
/// whole run went through the primary paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnalysisReport {
    pub records: Vec<AnalysisRecord>,
    /// One label per cluster id present in `records`, sorted by id.
    pub labels: Vec<ClusterLabel>,
    pub issues: Vec<IssueAgendaItem>,
    /// Embedding provider name, or `lexical` after a fallback.
    pub embedding_source: String,
    pub cluster_method: Option<ClusterMethod>,
    pub degradations: Vec<Degradation>,
}

impl AnalysisReport {
    /// Report for "nothing to analyze".
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    #[must_use]
    pub fn label(&self, id: ClusterId) -> Option<&ClusterLabel> {
        self.labels.iter().find(|l| l.id == id)
    }

    /// Number of records assigned to the small-voice sentinel.
    #[must_use]
    pub fn small_voice_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_noise).count()
    }

    /// Number of distinct non-noise topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.labels.iter().filter(|l| !l.is_noise).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Stage;

    fn record(id: i32) -> AnalysisRecord {
        AnalysisRecord {
            original_text: "text".into(),
            created_at: None,
            sub_topic: "topic".into(),
            summary: "text".into(),
            x: 0.0,
            y: 0.0,
            cluster_id: ClusterId(id),
            is_noise: id == -1,
            sentiment: None,
        }
    }

    #[test]
    fn empty_report() {
        let report = AnalysisReport::empty();
        assert!(report.is_empty());
        assert!(!report.is_degraded());
        assert_eq!(report.topic_count(), 0);
    }

    #[test]
    fn counts_topics_and_small_voices() {
        let report = AnalysisReport {
            records: vec![record(0), record(1), record(-1), record(0)],
            labels: vec![
                ClusterLabel::reserved("Small Voice", 1),
                ClusterLabel::fallback(ClusterId(0), 2),
                ClusterLabel::fallback(ClusterId(1), 1),
            ],
            degradations: vec![Degradation {
                stage: Stage::Naming,
                reason: "timeout".into(),
            }],
            ..AnalysisReport::default()
        };
        assert_eq!(report.small_voice_count(), 1);
        assert_eq!(report.topic_count(), 2);
        assert!(report.is_degraded());
        assert_eq!(report.label(ClusterId(1)).unwrap().name, "Group 1");
        assert!(report.label(ClusterId(7)).is_none());
    }

    #[test]
    fn sentiment_omitted_when_absent() {
        let json = serde_json::to_value(record(0)).unwrap();
        assert!(json.get("sentiment").is_none());
        assert_eq!(json["cluster_id"], 0);
    }
}
