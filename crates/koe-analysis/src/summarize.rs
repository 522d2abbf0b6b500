//! Comment, thread, and casual-board summarizers.
//!
//! All three follow the same contract as the rest of the LLM-backed stages:
//! one call, defensive parsing, and an empty degraded value on failure.
//! Empty input never reaches the provider.

use std::sync::Arc;
use std::time::Duration;

use koe_core::entities::{
    CommentSummary, NextStep, SurveyRecommendation, SurveyRecommendations, ThreadComment,
    ThreadSummary,
};
use koe_core::quality::Graded;
use koe_llm::parse::{find_array_field, parse_json};
use koe_llm::{LlmError, TextGenerator, generate_with_timeout};
use serde::de::DeserializeOwned;

/// Summary used for a thread with no comments.
pub const EMPTY_THREAD_SUMMARY: &str = "No discussion yet.";

/// Summary used when there are no comments to summarize.
pub const EMPTY_COMMENTS_SUMMARY: &str = "No comments yet.";

const MAX_KEY_TRENDS: usize = 5;
const MAX_MINORITY_IDEAS: usize = 3;
const MAX_RECOMMENDATIONS: usize = 3;

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    language: String,
    timeout: Duration,
}

impl Summarizer {
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            language: language.into(),
            timeout,
        }
    }

    /// Overall reaction, recurring points, and minority ideas in `comments`.
    pub async fn summarize_comments(&self, comments: &[String]) -> Graded<CommentSummary> {
        let comments: Vec<String> = comments
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        if comments.is_empty() {
            return Graded::healthy(CommentSummary {
                overall_summary: EMPTY_COMMENTS_SUMMARY.into(),
                ..CommentSummary::default()
            });
        }

        let prompt = crate::prompts::comment_summary(&self.language, &comments);
        match self.call(&prompt, parse_json::<CommentSummary>).await {
            Ok(mut summary) => {
                summary.key_trends.truncate(MAX_KEY_TRENDS);
                summary.minority_ideas.truncate(MAX_MINORITY_IDEAS);
                tracing::info!(
                    comments = comments.len(),
                    trends = summary.key_trends.len(),
                    "comments summarized"
                );
                Graded::healthy(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "comment summary failed");
                Graded::degraded(CommentSummary::default(), e.to_string())
            }
        }
    }

    /// Digest of a discussion thread plus at most
    /// [`ThreadSummary::MAX_NEXT_STEPS`] next steps.
    pub async fn summarize_thread(&self, comments: &[ThreadComment]) -> Graded<ThreadSummary> {
        if comments.iter().all(|c| c.content.trim().is_empty()) {
            return Graded::healthy(ThreadSummary {
                summary: EMPTY_THREAD_SUMMARY.into(),
                next_steps: Vec::new(),
            });
        }

        let prompt = crate::prompts::thread_next_steps(
            &self.language,
            ThreadSummary::MAX_NEXT_STEPS,
            comments,
        );
        match self.call(&prompt, parse_thread).await {
            Ok(mut summary) => {
                summary.next_steps.truncate(ThreadSummary::MAX_NEXT_STEPS);
                tracing::info!(
                    comments = comments.len(),
                    next_steps = summary.next_steps.len(),
                    "thread summarized"
                );
                Graded::healthy(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "thread summary failed");
                Graded::degraded(ThreadSummary::default(), e.to_string())
            }
        }
    }

    /// Surveys worth running, inferred from casual-board `posts`. An empty
    /// list is a valid answer.
    pub async fn recommend_surveys(
        &self,
        posts: &[String],
        org_name: &str,
    ) -> Graded<SurveyRecommendations> {
        let posts: Vec<String> = posts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        if posts.is_empty() {
            return Graded::healthy(SurveyRecommendations::default());
        }

        let prompt = crate::prompts::survey_recommendations(&self.language, org_name, &posts);
        match self
            .call(&prompt, |text| {
                items::<SurveyRecommendation>(text, "recommendations")
            })
            .await
        {
            Ok(mut recommendations) => {
                recommendations.truncate(MAX_RECOMMENDATIONS);
                tracing::info!(
                    posts = posts.len(),
                    recommendations = recommendations.len(),
                    "survey recommendations generated"
                );
                Graded::healthy(SurveyRecommendations { recommendations })
            }
            Err(e) => {
                tracing::warn!(error = %e, "survey recommendation failed");
                Graded::degraded(SurveyRecommendations::default(), e.to_string())
            }
        }
    }

    async fn call<T>(
        &self,
        prompt: &str,
        parse: impl FnOnce(&str) -> Result<T, LlmError>,
    ) -> Result<T, LlmError> {
        let text = generate_with_timeout(self.generator.as_ref(), prompt, self.timeout).await?;
        parse(&text)
    }
}

/// A `{"summary", "next_steps"}` object, or a bare list of steps.
fn parse_thread(text: &str) -> Result<ThreadSummary, LlmError> {
    if let Ok(summary) = parse_json::<ThreadSummary>(text) {
        if !summary.summary.is_empty() || !summary.next_steps.is_empty() {
            return Ok(summary);
        }
    }
    Ok(ThreadSummary {
        summary: String::new(),
        next_steps: items::<NextStep>(text, "next_steps")?,
    })
}

/// Entries of the `field` array that deserialize into `T`; malformed entries
/// are dropped.
fn items<T: DeserializeOwned>(text: &str, field: &str) -> Result<Vec<T>, LlmError> {
    Ok(find_array_field(text, field)?
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}
