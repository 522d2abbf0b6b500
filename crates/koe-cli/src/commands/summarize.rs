use koe_analysis::Analyzer;
use koe_config::KoeConfig;
use koe_core::quality::Graded;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{InputArgs, RecommendArgs};
use crate::commands::shared::input::{read_texts, read_thread};
use crate::output;
use crate::progress::Progress;

/// Handle `koe summarize-comments`.
pub async fn handle_comments(
    args: &InputArgs,
    config: KoeConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let comments = read_texts(args)?.texts;
    let summarizer = Analyzer::from_config(config, flags.offline).summarizer();

    let progress = Progress::spinner(&format!("summarizing {} comments", comments.len()));
    let graded = summarizer.summarize_comments(&comments).await;
    progress.finish_clear();
    finish("comment summary", graded, flags)
}

/// Handle `koe summarize-thread`.
pub async fn handle_thread(
    args: &InputArgs,
    config: KoeConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let comments = read_thread(args)?;
    let summarizer = Analyzer::from_config(config, flags.offline).summarizer();

    let progress = Progress::spinner(&format!("summarizing a thread of {}", comments.len()));
    let graded = summarizer.summarize_thread(&comments).await;
    progress.finish_clear();
    finish("thread summary", graded, flags)
}

/// Handle `koe recommend-surveys`.
pub async fn handle_surveys(
    args: &RecommendArgs,
    config: KoeConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let posts = read_texts(&args.input)?.texts;
    let summarizer = Analyzer::from_config(config, flags.offline).summarizer();

    let progress = Progress::spinner(&format!("reading {} posts", posts.len()));
    let graded = summarizer.recommend_surveys(&posts, &args.org_name).await;
    progress.finish_clear();
    finish("survey recommendations", graded, flags)
}

fn finish<T: Serialize>(what: &str, graded: Graded<T>, flags: &GlobalFlags) -> anyhow::Result<()> {
    if let Some(reason) = graded.quality.reason() {
        output::warn_degraded(&[format!("{what}: {reason}")], flags);
    }
    output::emit(&graded.value, flags)
}
