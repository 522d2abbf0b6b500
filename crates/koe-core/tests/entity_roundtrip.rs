//! Serde roundtrip and JsonSchema validation tests for all entity types.

use chrono::{TimeZone, Utc};
use koe_core::entities::*;
use koe_core::enums::*;
use koe_core::quality::Degradation;
use schemars::schema_for;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            // Serde roundtrip
            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            pretty_assertions::assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            // Schema validation
            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn sample_record(id: i32, text: &str) -> AnalysisRecord {
    AnalysisRecord {
        original_text: text.into(),
        created_at: Some(Utc.with_ymd_and_hms(2025, 4, 1, 9, 30, 0).unwrap()),
        sub_topic: if id == -1 {
            "Small Voice".into()
        } else {
            "Performance".into()
        },
        summary: text.into(),
        x: 1.25,
        y: -0.5,
        cluster_id: ClusterId(id),
        is_noise: id == -1,
        sentiment: None,
    }
}

roundtrip_and_validate!(
    analysis_request_roundtrip,
    AnalysisRequest,
    AnalysisRequest::new(vec!["システムが遅い".into(), "画面が重い".into()])
        .with_theme("社内システム")
        .with_timestamps(vec![Some(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()), None])
);

roundtrip_and_validate!(
    cluster_label_roundtrip,
    ClusterLabel,
    ClusterLabel {
        sentiment: Some(-0.25),
        ..ClusterLabel::generated(ClusterId(2), "動作速度".into(), 14)
    }
);

roundtrip_and_validate!(
    projected_point_roundtrip,
    ProjectedPoint,
    ProjectedPoint::new(-3.5, 7.25)
);

roundtrip_and_validate!(
    issue_agenda_item_roundtrip,
    IssueAgendaItem,
    IssueAgendaItem {
        title: "Slow internal tools".into(),
        description: "Many answers describe waiting on page loads.".into(),
        urgency: Urgency::High,
        category: "infrastructure".into(),
        related_topics: vec!["Performance".into()],
        source: IssueSource::Majority,
    }
);

roundtrip_and_validate!(
    analysis_record_roundtrip,
    AnalysisRecord,
    AnalysisRecord {
        sentiment: Some(0.5),
        ..sample_record(0, "もっと早くしてほしい")
    }
);

roundtrip_and_validate!(
    analysis_report_roundtrip,
    AnalysisReport,
    AnalysisReport {
        records: vec![
            sample_record(0, "システムが遅い"),
            sample_record(-1, "社食にビーガンメニューを"),
        ],
        labels: vec![
            ClusterLabel::reserved("Small Voice", 1),
            ClusterLabel::generated(ClusterId(0), "Performance".into(), 1),
        ],
        issues: vec![IssueAgendaItem {
            title: "Small Voice".into(),
            description: "社食にビーガンメニューを".into(),
            urgency: Urgency::Unspecified,
            category: String::new(),
            related_topics: vec!["Small Voice".into()],
            source: IssueSource::SmallVoice,
        }],
        embedding_source: "lexical".into(),
        cluster_method: Some(ClusterMethod::Partition { k: 2 }),
        degradations: vec![Degradation {
            stage: Stage::Embedding,
            reason: "provider unavailable".into(),
        }],
    }
);

roundtrip_and_validate!(
    comment_summary_roundtrip,
    CommentSummary,
    CommentSummary {
        overall_summary: "Broad support with cost concerns.".into(),
        key_trends: vec!["cost".into(), "timing".into()],
        minority_ideas: vec!["pilot in one team first".into()],
    }
);

roundtrip_and_validate!(
    thread_comment_roundtrip,
    ThreadComment,
    ThreadComment {
        author: "Sato".into(),
        content: "Can we try this next quarter?".into(),
        created_at: None,
    }
);

roundtrip_and_validate!(
    thread_summary_roundtrip,
    ThreadSummary,
    ThreadSummary {
        summary: "Agreed to trial a shorter weekly meeting.".into(),
        next_steps: vec![NextStep {
            title: "Collect budget estimates".into(),
            detail: "Ask finance for a rough number before the next meeting.".into(),
        }],
    }
);

roundtrip_and_validate!(
    survey_recommendations_roundtrip,
    SurveyRecommendations,
    SurveyRecommendations {
        recommendations: vec![SurveyRecommendation {
            title: "Remote work satisfaction".into(),
            reason: "Several posts mention commuting fatigue.".into(),
            survey_description: "Measure how remote days affect focus.".into(),
            suggested_questions: vec!["How many remote days do you prefer?".into()],
        }],
    }
);

#[test]
fn thread_comment_defaults_author() {
    let comment: ThreadComment = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
    assert_eq!(comment.author, "Anonymous");
}
