//! Gemini REST client (`generateContent`, `batchEmbedContents`).

use std::time::Instant;

use async_trait::async_trait;
use koe_config::ProviderConfig;
use koe_embeddings::{EmbeddingError, EmbeddingProvider};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::http::check_response;
use crate::TextGenerator;

/// Largest `batchEmbedContents` request the API accepts.
const MAX_EMBED_BATCH: usize = 100;

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, LlmError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::EmptyResponse(format!("prompt blocked: {reason}")));
        }
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(LlmError::EmptyResponse("no candidates".into()));
        };
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(LlmError::EmptyResponse(format!(
                "candidate has no text (finish reason: {reason})"
            )));
        }
        Ok(text)
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// HTTP client for the Gemini API. Implements both [`TextGenerator`] and
/// [`EmbeddingProvider`].
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    generation_model: String,
    embedding_model: String,
    embedding_name: String,
    temperature: f32,
}

impl GeminiClient {
    /// Build a client from provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Unavailable`] when no API key is configured, or
    /// [`LlmError::Http`] if the underlying `reqwest::Client` fails to build.
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        if !config.is_configured() {
            return Err(LlmError::Unavailable("no API key configured".into()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("koe/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_name: format!("gemini:{}", config.embedding_model),
            temperature: config.temperature,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url, self.generation_model
        )
    }

    fn embed_url(&self) -> String {
        format!(
            "{}/models/{}:batchEmbedContents",
            self.base_url, self.embedding_model
        )
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.embedding_model)
    }

    /// Call `generateContent` with a JSON response type.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the request fails, the API returns a
    /// non-success status, or the response carries no text.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, LlmError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![PartOut { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.temperature,
            },
        };

        let start = Instant::now();
        let resp = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let data: GenerateResponse = resp.json().await?;
        let text = data.into_text()?;

        tracing::debug!(
            model = %self.generation_model,
            prompt_chars = prompt.chars().count(),
            response_chars = text.chars().count(),
            elapsed_ms = start.elapsed().as_millis(),
            "generateContent finished"
        );
        Ok(text)
    }

    /// Call `batchEmbedContents` for up to 100 texts.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the request fails or the response is malformed.
    pub async fn batch_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self.model_path();
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &model,
                    content: Content {
                        role: None,
                        parts: vec![PartOut { text }],
                    },
                })
                .collect(),
        };

        let resp = self
            .http
            .post(self.embed_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let data: BatchEmbedResponse = resp.json().await?;
        Ok(data.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        &self.generation_model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate_content(prompt).await
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    fn name(&self) -> &str {
        &self.embedding_name
    }

    fn max_batch_size(&self) -> usize {
        MAX_EMBED_BATCH
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_embed(texts)
            .await
            .map_err(|e| EmbeddingError::EmbedFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> GeminiClient {
        GeminiClient::new(&ProviderConfig {
            api_key: "test-key".into(),
            base_url: "https://example.test/v1beta/".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn requires_api_key() {
        let err = GeminiClient::new(&ProviderConfig::default()).err().unwrap();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[test]
    fn builds_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.generate_url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            client.embed_url(),
            "https://example.test/v1beta/models/text-embedding-004:batchEmbedContents"
        );
        assert_eq!(EmbeddingProvider::name(&client), "gemini:text-embedding-004");
        assert_eq!(TextGenerator::name(&client), "gemini-2.0-flash");
    }

    #[test]
    fn generate_request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![PartOut { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.5,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn embed_request_omits_role() {
        let body = EmbedRequest {
            model: "models/text-embedding-004",
            content: Content {
                role: None,
                parts: vec![PartOut { text: "hi" }],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["content"].get("role").is_none());
        assert_eq!(json["model"], "models/text-embedding-004");
    }

    #[test]
    fn joins_candidate_parts() {
        let data: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]},
                "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(data.into_text().unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn blocked_prompt_is_empty_response() {
        let data: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = data.into_text().unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn candidate_without_text_reports_finish_reason() {
        let data: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#).unwrap();
        let err = data.into_text().unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse(ref m) if m.contains("MAX_TOKENS")));
    }

    #[test]
    fn parses_batch_embed_response() {
        let data: BatchEmbedResponse = serde_json::from_str(
            r#"{"embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, 0.4]}]}"#,
        )
        .unwrap();
        assert_eq!(data.embeddings.len(), 2);
        assert_eq!(data.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[tokio::test]
    #[ignore = "requires network and GEMINI_API_KEY"]
    async fn live_generate_and_embed() {
        let config = ProviderConfig {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        let text = client
            .generate_content(r#"Return {"ok": true} as JSON."#)
            .await
            .unwrap();
        assert!(text.contains("ok"));

        let vectors = client
            .batch_embed(&["システムが遅い".to_string(), "画面が重い".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
    }
}
