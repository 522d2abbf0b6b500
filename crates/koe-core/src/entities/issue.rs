use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{IssueSource, Urgency};

/// One discussion agenda item synthesized from an analysis run.
///
/// `urgency` and `category` are display hints: whatever the model returned is
/// passed through (unknown urgencies become `unspecified`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IssueAgendaItem {
    pub title: String,
    #[serde(default, alias = "insight")]
    pub description: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub related_topics: Vec<String>,
    #[serde(default, alias = "source_type")]
    pub source: IssueSource,
}

impl IssueAgendaItem {
    #[must_use]
    pub fn is_small_voice(&self) -> bool {
        self.source == IssueSource::SmallVoice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_original_field_names() {
        let raw = r#"{
            "title": "Small Voice",
            "insight": "The following opinions were raised.",
            "related_topics": ["Small Voice"],
            "source_type": "small_voice"
        }"#;
        let item: IssueAgendaItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.description, "The following opinions were raised.");
        assert!(item.is_small_voice());
        assert_eq!(item.urgency, Urgency::Unspecified);
        assert!(item.category.is_empty());
    }
}
