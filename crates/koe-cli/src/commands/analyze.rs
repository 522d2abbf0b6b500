use anyhow::Context;
use koe_analysis::Analyzer;
use koe_analysis::pipeline::degradation_summary;
use koe_config::KoeConfig;
use koe_core::entities::{AnalysisReport, AnalysisRequest};

use crate::cli::root_commands::AnalyzeArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::commands::shared::input::read_texts;
use crate::output::{self, table};
use crate::progress::Progress;

/// Handle `koe analyze`.
pub async fn handle(args: &AnalyzeArgs, config: KoeConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = run(args, config, flags.offline).await?;

    output::warn_degraded(&degradation_summary(&report.degradations), flags);
    if flags.format == OutputFormat::Table {
        output::write_text(&render_report(&report), flags)
    } else {
        output::emit(&report, flags)
    }
}

async fn run(args: &AnalyzeArgs, config: KoeConfig, offline: bool) -> anyhow::Result<AnalysisReport> {
    let input = read_texts(&args.input)?;
    let timestamps = input.timestamps();
    let count = input.texts.len();

    let mut request = AnalysisRequest::new(input.texts);
    if let Some(theme) = &args.theme {
        request = request.with_theme(theme.clone());
    }
    if let Some(timestamps) = timestamps {
        request = request.with_timestamps(timestamps);
    }

    let analyzer = Analyzer::from_config(config, offline);
    let progress = Progress::spinner(&format!("analyzing {count} answers"));
    let result = if args.no_issues {
        analyzer.cluster_texts(&request).await
    } else {
        analyzer.analyze(&request).await
    };

    match result {
        Ok(report) => {
            progress.finish_clear();
            Ok(report)
        }
        Err(error) => {
            progress.finish_err("analysis failed");
            Err(error).context("analysis failed")
        }
    }
}

/// Topics, agenda, and per-answer rows as three tables.
fn render_report(report: &AnalysisReport) -> String {
    if report.is_empty() {
        return String::from("(no answers)");
    }
    let options = output::table_options();

    let topics = report
        .labels
        .iter()
        .map(|label| {
            vec![
                label.id.to_string(),
                label.name.clone(),
                label.size.to_string(),
                label.source.to_string(),
                label
                    .sentiment
                    .map_or_else(|| String::from("-"), |s| format!("{s:.2}")),
            ]
        })
        .collect::<Vec<_>>();

    let records = report
        .records
        .iter()
        .map(|record| {
            vec![
                record.cluster_id.to_string(),
                record.sub_topic.clone(),
                format!("{:.3}", record.x),
                format!("{:.3}", record.y),
                record.summary.clone(),
            ]
        })
        .collect::<Vec<_>>();

    let mut sections = vec![
        format!(
            "Topics ({} via {})",
            report.topic_count(),
            report.embedding_source
        ),
        table::render_entity_table(
            &["id", "name", "size", "source", "sentiment"],
            &topics,
            options,
        ),
    ];

    if !report.issues.is_empty() {
        let issues = report
            .issues
            .iter()
            .map(|issue| {
                vec![
                    issue.urgency.to_string(),
                    issue.source.to_string(),
                    issue.title.clone(),
                    issue.related_topics.join(", "),
                ]
            })
            .collect::<Vec<_>>();
        sections.push(String::new());
        sections.push(String::from("Agenda"));
        sections.push(table::render_entity_table(
            &["urgency", "source", "title", "topics"],
            &issues,
            options,
        ));
    }

    sections.push(String::new());
    sections.push(String::from("Answers"));
    sections.push(table::render_entity_table(
        &["id", "sub_topic", "x", "y", "summary"],
        &records,
        options,
    ));
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::root_commands::InputArgs;
    use koe_config::EmbeddingBackend;
    use koe_core::entities::ClusterId;
    use std::io::Write;

    fn offline_config() -> KoeConfig {
        let mut config = KoeConfig::default();
        config.embedding.backend = EmbeddingBackend::Lexical;
        config
    }

    fn args(path: &std::path::Path, no_issues: bool) -> AnalyzeArgs {
        AnalyzeArgs {
            input: InputArgs {
                input: Some(path.to_string_lossy().into_owned()),
                jsonl: false,
            },
            theme: Some("Workplace".into()),
            no_issues,
        }
    }

    fn answers_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        for i in 0..12 {
            writeln!(file, "too many meetings every week {i}").unwrap();
            writeln!(file, "salary review is too slow {i}").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn offline_lexical_run_covers_every_answer() {
        let file = answers_file();
        let report = run(&args(file.path(), false), offline_config(), true)
            .await
            .unwrap();

        assert_eq!(report.records.len(), 24);
        assert_eq!(report.embedding_source, "lexical");
        assert!(report.issues.is_empty());
        for record in &report.records {
            assert!(report.label(record.cluster_id).is_some());
        }
    }

    #[tokio::test]
    async fn blank_file_gives_empty_report() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "\n   \n").unwrap();
        let report = run(&args(file.path(), true), offline_config(), true)
            .await
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(render_report(&report), "(no answers)");
    }

    #[test]
    fn report_table_lists_topics_and_answers() {
        let mut report = AnalysisReport::empty();
        report.embedding_source = "lexical".into();
        report.labels.push(koe_core::entities::ClusterLabel::generated(
            ClusterId(0),
            "Meetings".into(),
            1,
        ));
        report.records.push(koe_core::entities::AnalysisRecord {
            original_text: "too many meetings".into(),
            created_at: None,
            sub_topic: "Meetings".into(),
            summary: "too many meetings".into(),
            x: 0.5,
            y: -0.25,
            cluster_id: ClusterId(0),
            is_noise: false,
            sentiment: None,
        });

        let rendered = render_report(&report);
        assert!(rendered.starts_with("Topics (1 via lexical)"));
        assert!(rendered.contains("Answers"));
        assert!(rendered.contains("-0.250"));
        assert!(!rendered.contains("Agenda"));
    }
}
