//! Reading command input from files or stdin.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use koe_core::entities::ThreadComment;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cli::root_commands::InputArgs;

/// One JSON Lines row of free text.
#[derive(Debug, Deserialize)]
struct TextRow {
    #[serde(alias = "content")]
    text: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Texts and their optional timestamps, blank items dropped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Texts {
    pub texts: Vec<String>,
    pub timestamps: Vec<Option<DateTime<Utc>>>,
}

impl Texts {
    /// Timestamps, or `None` when no row carried one.
    #[must_use]
    pub fn timestamps(&self) -> Option<Vec<Option<DateTime<Utc>>>> {
        self.timestamps
            .iter()
            .any(Option::is_some)
            .then(|| self.timestamps.clone())
    }
}

fn is_stdin(args: &InputArgs) -> bool {
    args.input.as_deref().is_none_or(|p| p == "-")
}

fn is_jsonl(args: &InputArgs) -> bool {
    args.jsonl
        || args.input.as_deref().is_some_and(|p| {
            Path::new(p)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("jsonl") || e.eq_ignore_ascii_case("ndjson"))
        })
}

fn read_all(args: &InputArgs) -> anyhow::Result<String> {
    if is_stdin(args) {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    let path = args.input.as_deref().unwrap_or_default();
    std::fs::read_to_string(path).with_context(|| format!("failed to read input file {path}"))
}

fn jsonl_rows<T: DeserializeOwned>(args: &InputArgs) -> anyhow::Result<Vec<T>> {
    if is_stdin(args) {
        return parse_jsonl_str(&read_all(args)?);
    }
    let path = args.input.as_deref().unwrap_or_default();
    serde_jsonlines::json_lines(path)
        .with_context(|| format!("failed to open {path}"))?
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("{path}: invalid JSON on line {}", i + 1)))
        .collect()
}

fn parse_jsonl_str<T: DeserializeOwned>(raw: &str) -> anyhow::Result<Vec<T>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid JSON on line {}", i + 1))
        })
        .collect()
}

fn plain_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Free-text items for `analyze`, `summarize-comments`, and `recommend-surveys`.
pub fn read_texts(args: &InputArgs) -> anyhow::Result<Texts> {
    let mut out = Texts::default();
    if is_jsonl(args) {
        for row in jsonl_rows::<TextRow>(args)? {
            let text = row.text.trim();
            if !text.is_empty() {
                out.texts.push(text.to_string());
                out.timestamps.push(row.created_at);
            }
        }
    } else {
        out.texts = plain_lines(&read_all(args)?);
        out.timestamps = vec![None; out.texts.len()];
    }
    tracing::debug!(count = out.texts.len(), "read input texts");
    Ok(out)
}

/// Thread comments for `summarize-thread`. Plain-text lines may carry the
/// author as a `[name] ` prefix.
pub fn read_thread(args: &InputArgs) -> anyhow::Result<Vec<ThreadComment>> {
    let comments: Vec<ThreadComment> = if is_jsonl(args) {
        jsonl_rows(args)?
    } else {
        plain_lines(&read_all(args)?)
            .into_iter()
            .map(|line| parse_thread_line(&line))
            .collect()
    };
    Ok(comments
        .into_iter()
        .filter(|c| !c.content.trim().is_empty())
        .collect())
}

fn parse_thread_line(line: &str) -> ThreadComment {
    let (author, content) = line
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map_or(("Anonymous", line), |(author, content)| {
            (author.trim(), content.trim())
        });
    ThreadComment {
        author: if author.is_empty() { "Anonymous" } else { author }.to_string(),
        content: content.to_string(),
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn args(path: &Path) -> InputArgs {
        InputArgs {
            input: Some(path.to_string_lossy().into_owned()),
            jsonl: false,
        }
    }

    #[test]
    fn plain_text_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "Too many meetings\n\n   \n会議が多すぎる  ").unwrap();

        let texts = read_texts(&args(file.path())).unwrap();
        assert_eq!(texts.texts, vec!["Too many meetings", "会議が多すぎる"]);
        assert_eq!(texts.timestamps(), None);
    }

    #[test]
    fn jsonl_reads_text_and_timestamps() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(
            file,
            r#"{{"text": "VPN drops", "created_at": "2024-04-01T09:30:00Z"}}
{{"content": "Need a second monitor"}}
{{"text": "   "}}"#
        )
        .unwrap();

        let texts = read_texts(&args(file.path())).unwrap();
        assert_eq!(texts.texts, vec!["VPN drops", "Need a second monitor"]);
        let stamps = texts.timestamps().unwrap();
        assert_eq!(stamps.len(), 2);
        assert!(stamps[0].is_some());
        assert!(stamps[1].is_none());
    }

    #[test]
    fn jsonl_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(file, "{{\"text\": \"ok\"}}\nnot json").unwrap();
        assert!(read_texts(&args(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_texts(&args(&dir.path().join("missing.txt"))).unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn thread_lines_carry_authors() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "[Aki] Shall we try it?\nNo author here\n[] empty author").unwrap();

        let comments = read_thread(&args(file.path())).unwrap();
        let pairs: Vec<(&str, &str)> = comments
            .iter()
            .map(|c| (c.author.as_str(), c.content.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Aki", "Shall we try it?"),
                ("Anonymous", "No author here"),
                ("Anonymous", "empty author"),
            ]
        );
    }

    #[test]
    fn thread_jsonl_accepts_user_name() {
        let mut file = tempfile::NamedTempFile::with_suffix(".ndjson").unwrap();
        writeln!(file, r#"{{"user_name": "Ren", "content": "Let us vote"}}"#).unwrap();
        let comments = read_thread(&args(file.path())).unwrap();
        assert_eq!(comments[0].author, "Ren");
    }
}
