//! Discussion agenda synthesis.
//!
//! Records are split into majority topics (every non-noise cluster, sampled)
//! and small voices (the `-1` sentinel, all of them up to the sample cap).
//! One generation call turns both into agenda items.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use koe_config::IssuesConfig;
use koe_core::entities::{AnalysisRecord, ClusterId, IssueAgendaItem};
use koe_core::enums::{IssueSource, Urgency};
use koe_core::quality::Graded;
use koe_llm::parse::find_array_field;
use koe_llm::{LlmError, TextGenerator, generate_with_timeout};
use serde_json::Value;

use crate::prompts::{self, TopicSamples};

/// Opinions quoted in the deterministic small-voice item.
const QUOTED_SMALL_VOICES: usize = 10;

pub struct IssueSynthesizer {
    generator: Arc<dyn TextGenerator>,
    config: IssuesConfig,
    small_voice_label: String,
    language: String,
    timeout: Duration,
}

impl IssueSynthesizer {
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        config: IssuesConfig,
        small_voice_label: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            config,
            small_voice_label: small_voice_label.into(),
            language: language.into(),
            timeout,
        }
    }

    /// Build the agenda for `records`.
    ///
    /// A failed or unparseable call yields an empty, degraded list. When the
    /// small-voice group is non-empty and the parsed agenda has no
    /// small-voice item, one listing those opinions is appended.
    pub async fn synthesize(
        &self,
        records: &[AnalysisRecord],
        theme: &str,
    ) -> Graded<Vec<IssueAgendaItem>> {
        if records.is_empty() {
            return Graded::healthy(Vec::new());
        }

        let (topics, small_voices) = self.group(records);
        tracing::info!(
            topics = topics.len(),
            small_voices = small_voices.len(),
            "synthesizing agenda"
        );

        let prompt = prompts::issue_agenda(
            theme,
            &self.language,
            records.len(),
            &self.config,
            &self.small_voice_label,
            &topics,
            &small_voices,
        );

        let mut items = match generate_with_timeout(self.generator.as_ref(), &prompt, self.timeout)
            .await
            .and_then(|text| parse_items(&text, &self.small_voice_label))
        {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "agenda synthesis failed");
                return Graded::degraded(Vec::new(), e.to_string());
            }
        };

        let parsed = items.len();
        items = cap_items(items, self.config.majority_items, self.config.small_voice_items);
        if items.len() < parsed {
            tracing::debug!(parsed, kept = items.len(), "agenda trimmed to the configured size");
        }

        if !small_voices.is_empty() && !items.iter().any(IssueAgendaItem::is_small_voice) {
            tracing::debug!("agenda lacks a small-voice item, appending one");
            items.push(small_voice_item(&self.small_voice_label, &small_voices));
        }
        tracing::info!(items = items.len(), "agenda synthesized");
        Graded::healthy(items)
    }

    /// Majority topics by descending size (ties by id), each sampled in
    /// input order, plus the capped small-voice texts.
    fn group(&self, records: &[AnalysisRecord]) -> (Vec<TopicSamples>, Vec<String>) {
        let mut clusters: BTreeMap<ClusterId, Vec<&AnalysisRecord>> = BTreeMap::new();
        for record in records {
            clusters.entry(record.cluster_id).or_default().push(record);
        }

        let small_voices: Vec<String> = clusters
            .remove(&ClusterId::NOISE)
            .unwrap_or_default()
            .into_iter()
            .take(self.config.max_samples)
            .map(|r| r.original_text.clone())
            .collect();

        let mut topics: Vec<(ClusterId, Vec<&AnalysisRecord>)> = clusters.into_iter().collect();
        topics.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

        let topics = topics
            .into_iter()
            .map(|(_, members)| {
                let take = self.config.samples_for(members.len());
                TopicSamples {
                    name: members[0].sub_topic.clone(),
                    total: members.len(),
                    samples: members
                        .iter()
                        .take(take)
                        .map(|r| r.original_text.clone())
                        .collect(),
                }
            })
            .collect();
        (topics, small_voices)
    }
}

fn small_voice_item(label: &str, opinions: &[String]) -> IssueAgendaItem {
    let quoted = opinions
        .iter()
        .take(QUOTED_SMALL_VOICES)
        .map(|o| format!("\"{}\"", o.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join(", ");
    IssueAgendaItem {
        title: label.to_string(),
        description: format!("The following opinions were raised: {quoted}"),
        urgency: Urgency::Unspecified,
        category: label.to_string(),
        related_topics: vec![label.to_string()],
        source: IssueSource::SmallVoice,
    }
}

/// Agenda items from an `{"issues": [...]}` object or a bare array. Items
/// without a title are skipped.
fn parse_items(text: &str, small_voice_label: &str) -> Result<Vec<IssueAgendaItem>, LlmError> {
    let values = find_array_field(text, "issues")?;
    Ok(values
        .iter()
        .filter_map(|v| parse_item(v, small_voice_label))
        .collect())
}

fn parse_item(value: &Value, small_voice_label: &str) -> Option<IssueAgendaItem> {
    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| value.get(*k).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
    };

    let title = text(&["title"]).filter(|t| !t.is_empty())?;
    let related_topics = match value.get("related_topics") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };
    let source = match text(&["source_type", "source"]) {
        Some(raw) if raw.to_ascii_lowercase().contains("small") => IssueSource::SmallVoice,
        Some(raw) if !raw.is_empty() => IssueSource::Majority,
        _ if title == small_voice_label
            || related_topics.iter().any(|t| t == small_voice_label) =>
        {
            IssueSource::SmallVoice
        }
        _ => IssueSource::Majority,
    };

    Some(IssueAgendaItem {
        title,
        description: text(&["insight", "description"]).unwrap_or_default(),
        urgency: text(&["urgency"]).map_or(Urgency::Unspecified, |u| Urgency::parse_lenient(&u)),
        category: text(&["category"]).unwrap_or_default(),
        related_topics,
        source,
    })
}

/// Keep at most `majority` majority items and `small_voice` small-voice
/// items, in the order the model returned them.
fn cap_items(
    items: Vec<IssueAgendaItem>,
    majority: usize,
    small_voice: usize,
) -> Vec<IssueAgendaItem> {
    let (mut majority_left, mut small_voice_left) = (majority, small_voice);
    items
        .into_iter()
        .filter(|item| {
            let left = if item.is_small_voice() {
                &mut small_voice_left
            } else {
                &mut majority_left
            };
            if *left == 0 {
                return false;
            }
            *left -= 1;
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use koe_llm::DisabledGenerator;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct FixedGenerator {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedGenerator {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    fn record(id: i32, topic: &str, text: &str) -> AnalysisRecord {
        AnalysisRecord {
            original_text: text.into(),
            created_at: None,
            sub_topic: topic.into(),
            summary: text.into(),
            x: 0.0,
            y: 0.0,
            cluster_id: ClusterId(id),
            is_noise: id == -1,
            sentiment: None,
        }
    }

    fn synthesizer(generator: Arc<dyn TextGenerator>) -> IssueSynthesizer {
        IssueSynthesizer::new(
            generator,
            IssuesConfig::default(),
            "Small Voice",
            "English",
            Duration::from_secs(5),
        )
    }

    fn records() -> Vec<AnalysisRecord> {
        let mut records: Vec<_> = (0..12)
            .map(|i| record(0, "Meeting load", &format!("meeting complaint {i}")))
            .collect();
        records.extend((0..3).map(|i| record(1, "Tools", &format!("tool request {i}"))));
        records.push(record(-1, "Small Voice", "Try a four-day week"));
        records
    }

    const AGENDA: &str = r#"Here you go:
```json
{"issues": [
  {"title": "How can we make meetings shorter?", "related_topics": ["Meeting load"],
   "insight": "Twelve people mention it.", "urgency": "High", "category": "Process",
   "source_type": "majority"},
  {"title": "Small Voice", "related_topics": ["Small Voice"],
   "insight": "The following opinions were raised: a four-day week.",
   "urgency": "whenever", "source_type": "small_voice"},
  {"insight": "missing title"}
]}
```"#;

    #[tokio::test]
    async fn parses_agenda_and_samples_topics() {
        let generator = FixedGenerator::new(AGENDA);
        let graded = synthesizer(generator.clone())
            .synthesize(&records(), "General")
            .await;

        assert!(!graded.is_degraded());
        let items = graded.value;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].urgency, Urgency::High);
        assert_eq!(items[0].category, "Process");
        assert_eq!(items[0].source, IssueSource::Majority);
        assert_eq!(items[1].urgency, Urgency::Unspecified);
        assert!(items[1].is_small_voice());

        let prompts = generator.prompts.lock().unwrap();
        // 12 members sample at the 10-text floor, largest topic first.
        assert!(prompts[0].contains("### Topic: Meeting load (12 comments, 10 sampled)"));
        assert!(prompts[0].contains("### Topic: Tools (3 comments, 3 sampled)"));
        assert!(!prompts[0].contains("meeting complaint 10"));
        assert!(prompts[0].contains("Try a four-day week"));
        assert!(prompts[0].find("Meeting load (").unwrap() < prompts[0].find("Tools (").unwrap());
    }

    #[tokio::test]
    async fn appends_small_voice_item_when_missing() {
        let generator = FixedGenerator::new(
            r#"[{"title": "Tooling gaps", "related_topics": ["Tools"], "urgency": "low"}]"#,
        );
        let items = synthesizer(generator)
            .synthesize(&records(), "General")
            .await
            .value;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source, IssueSource::Majority);
        let last = &items[1];
        assert!(last.is_small_voice());
        assert_eq!(last.title, "Small Voice");
        assert!(last.description.contains("\"Try a four-day week\""));
    }

    #[tokio::test]
    async fn chatty_agenda_is_capped_to_configured_size() {
        let issues: Vec<String> = (0..10)
            .map(|i| format!(r#"{{"title": "Question {i}", "source_type": "majority"}}"#))
            .collect();
        let generator = FixedGenerator::new(&format!(r#"{{"issues": [{}]}}"#, issues.join(",")));
        let items = synthesizer(generator)
            .synthesize(&records(), "General")
            .await
            .value;

        assert_eq!(items.len(), IssuesConfig::default().total_items());
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles[..4],
            ["Question 0", "Question 1", "Question 2", "Question 3"]
        );
        assert!(items.last().unwrap().is_small_voice());
    }

    #[test]
    fn cap_keeps_order_within_each_source() {
        let item = |title: &str, source| IssueAgendaItem {
            title: title.into(),
            description: String::new(),
            urgency: Urgency::Unspecified,
            category: String::new(),
            related_topics: Vec::new(),
            source,
        };
        let items = vec![
            item("a", IssueSource::SmallVoice),
            item("b", IssueSource::Majority),
            item("c", IssueSource::SmallVoice),
            item("d", IssueSource::Majority),
            item("e", IssueSource::Majority),
        ];
        let titles: Vec<String> = cap_items(items, 2, 1).into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["a", "b", "d"]);
    }

    #[tokio::test]
    async fn no_small_voices_means_no_forced_item() {
        let generator = FixedGenerator::new(r#"{"issues": [{"title": "Tooling gaps"}]}"#);
        let records: Vec<_> = records().into_iter().filter(|r| !r.is_noise).collect();
        let items = synthesizer(generator.clone())
            .synthesize(&records, "General")
            .await
            .value;
        assert_eq!(items.len(), 1);
        assert!(
            generator.prompts.lock().unwrap()[0]
                .contains("No distinctive minority opinions were detected")
        );
    }

    #[tokio::test]
    async fn unparseable_response_degrades_to_empty() {
        let graded = synthesizer(FixedGenerator::new("I cannot help with that."))
            .synthesize(&records(), "General")
            .await;
        assert!(graded.is_degraded());
        assert!(graded.value.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_empty() {
        let graded = synthesizer(Arc::new(DisabledGenerator::new("offline mode")))
            .synthesize(&records(), "General")
            .await;
        assert!(graded.is_degraded());
        assert!(graded.value.is_empty());
    }

    #[tokio::test]
    async fn empty_records_skip_the_call() {
        let generator = FixedGenerator::new(AGENDA);
        let graded = synthesizer(generator.clone()).synthesize(&[], "General").await;
        assert!(!graded.is_degraded());
        assert!(graded.value.is_empty());
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn infers_small_voice_from_topics() {
        let value = serde_json::json!({
            "title": "Rare ideas",
            "related_topics": "Small Voice",
        });
        let item = parse_item(&value, "Small Voice").unwrap();
        assert!(item.is_small_voice());
        assert_eq!(item.related_topics, vec!["Small Voice".to_string()]);
    }
}
