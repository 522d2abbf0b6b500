use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// One free-text item to analyze (survey answer, comment, casual post).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TextUnit {
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Input of one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub texts: Vec<String>,
    /// Theme or survey title, used only to steer prompts.
    #[serde(default)]
    pub theme: Option<String>,
    /// Optional timestamps, index-aligned with `texts`.
    #[serde(default)]
    pub timestamps: Option<Vec<Option<DateTime<Utc>>>>,
}

impl AnalysisRequest {
    #[must_use]
    pub fn new(texts: Vec<String>) -> Self {
        Self {
            texts,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    #[must_use]
    pub fn with_timestamps(mut self, timestamps: Vec<Option<DateTime<Utc>>>) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    /// Theme name for prompts, defaulting to `General`.
    #[must_use]
    pub fn theme_or_default(&self) -> &str {
        self.theme
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("General")
    }

    /// Validate and convert into index-aligned text units.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if any text is blank after trimming,
    /// or [`CoreError::LengthMismatch`] if `timestamps` is not the same length
    /// as `texts`.
    pub fn text_units(&self) -> Result<Vec<TextUnit>, CoreError> {
        if let Some(ts) = &self.timestamps {
            if ts.len() != self.texts.len() {
                return Err(CoreError::LengthMismatch {
                    what: "timestamps".into(),
                    expected: self.texts.len(),
                    actual: ts.len(),
                });
            }
        }

        self.texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                if text.trim().is_empty() {
                    return Err(CoreError::Validation(format!(
                        "text at index {i} is blank"
                    )));
                }
                let created_at = self
                    .timestamps
                    .as_ref()
                    .and_then(|ts| ts.get(i).copied().flatten());
                Ok(TextUnit {
                    text: text.clone(),
                    created_at,
                })
            })
            .collect()
    }
}
