use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Summary of free-form comments on a proposal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CommentSummary {
    #[serde(default)]
    pub overall_summary: String,
    #[serde(default)]
    pub key_trends: Vec<String>,
    #[serde(default)]
    pub minority_ideas: Vec<String>,
}

/// One message in a discussion thread.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ThreadComment {
    #[serde(default = "default_author", alias = "user_name")]
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_author() -> String {
    "Anonymous".into()
}

/// Action item proposed for a discussion thread.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct NextStep {
    pub title: String,
    #[serde(default, alias = "description")]
    pub detail: String,
}

/// Next steps distilled from a discussion thread, at most three.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ThreadSummary {
    /// One-line digest of the discussion.
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub next_steps: Vec<NextStep>,
}

impl ThreadSummary {
    /// Maximum number of next steps kept from the model.
    pub const MAX_NEXT_STEPS: usize = 3;
}

/// One survey the organization could run next, inferred from casual posts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SurveyRecommendation {
    pub title: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub survey_description: String,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SurveyRecommendations {
    #[serde(default)]
    pub recommendations: Vec<SurveyRecommendation>,
}
