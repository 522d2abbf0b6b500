//! # koe-embeddings
//!
//! Text embedding for koe.
//!
//! - [`EmbeddingProvider`]: the seam every semantic backend implements (the
//!   remote Gemini client in `koe-llm`, [`LocalEmbedder`] here, fakes in tests)
//! - [`Embedder`]: batches texts through a provider under a per-call timeout
//!   and falls back to [`LexicalVectorizer`] on any provider failure
//! - [`ModelHandle`]: the lazily loaded, shareable local model slot
//!
//! ## Async usage
//!
//! The fastembed ONNX runtime is synchronous. [`LocalEmbedder`] moves every
//! call onto [`tokio::task::spawn_blocking`].

pub mod error;
pub mod lexical;
pub mod local;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use koe_config::EmbeddingConfig;
use koe_core::quality::Graded;

pub use error::EmbeddingError;
pub use lexical::LexicalVectorizer;
pub use local::{EmbeddingEngine, LocalEmbedder, ModelHandle};

/// Name reported in [`Embedded::source`] for lexical vectors.
pub const LEXICAL_SOURCE: &str = "lexical";

/// A backend that turns texts into semantic vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short name recorded on the report.
    fn name(&self) -> &str;

    /// Largest number of texts accepted in one call.
    fn max_batch_size(&self) -> usize;

    /// Embed one batch, returning one vector per text in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Vectors for one run plus the name of what produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub vectors: Vec<Vec<f32>>,
    pub source: String,
}

impl Embedded {
    #[must_use]
    pub fn empty(source: &str) -> Self {
        Self {
            vectors: Vec::new(),
            source: source.to_string(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectors.first().map_or(0, Vec::len)
    }
}

/// Embeds texts with a primary provider and a lexical fallback.
#[derive(Clone)]
pub struct Embedder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    lexical: LexicalVectorizer,
    batch_size: usize,
    timeout: Duration,
}

impl Embedder {
    /// Embedder that tries `provider` first. `None` uses the lexical
    /// vectorizer as the primary path.
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn EmbeddingProvider>>,
        config: &EmbeddingConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            lexical: LexicalVectorizer::new(config.ngram_min, config.ngram_max),
            batch_size: config.batch_size.max(1),
            timeout,
        }
    }

    #[must_use]
    pub fn lexical_only(config: &EmbeddingConfig) -> Self {
        Self::new(None, config, Duration::from_secs(1))
    }

    /// Name of the primary path.
    #[must_use]
    pub fn primary_name(&self) -> &str {
        self.provider.as_ref().map_or(LEXICAL_SOURCE, |p| p.name())
    }

    /// Embed `texts`, preserving order.
    ///
    /// Never fails: provider errors degrade to lexical vectors, and if the
    /// lexical vectorizer also fails the matrix is empty.
    pub async fn embed(&self, texts: &[String]) -> Graded<Embedded> {
        if texts.is_empty() {
            return Graded::healthy(Embedded::empty(self.primary_name()));
        }

        let Some(provider) = &self.provider else {
            return match self.embed_lexical(texts) {
                Ok(embedded) => Graded::healthy(embedded),
                Err(e) => {
                    tracing::warn!(error = %e, "lexical vectorizer failed");
                    Graded::degraded(Embedded::empty(LEXICAL_SOURCE), e.to_string())
                }
            };
        };

        let start = Instant::now();
        match self.embed_with(provider.as_ref(), texts).await {
            Ok(vectors) => {
                tracing::info!(
                    provider = provider.name(),
                    count = vectors.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "embedded texts"
                );
                Graded::healthy(Embedded {
                    vectors,
                    source: provider.name().to_string(),
                })
            }
            Err(provider_err) => {
                tracing::warn!(
                    provider = provider.name(),
                    error = %provider_err,
                    "embedding provider failed, falling back to lexical vectors"
                );
                match self.embed_lexical(texts) {
                    Ok(embedded) => Graded::degraded(
                        embedded,
                        format!("{} failed: {provider_err}", provider.name()),
                    ),
                    Err(lexical_err) => {
                        tracing::warn!(error = %lexical_err, "lexical fallback failed");
                        Graded::degraded(
                            Embedded::empty(LEXICAL_SOURCE),
                            format!(
                                "{} failed: {provider_err}; lexical fallback failed: {lexical_err}",
                                provider.name()
                            ),
                        )
                    }
                }
            }
        }
    }

    async fn embed_with(
        &self,
        provider: &dyn EmbeddingProvider,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let batch_size = self.batch_size.min(provider.max_batch_size()).max(1);
        let mut vectors = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(batch_size).enumerate() {
            tracing::debug!(batch = i, size = batch.len(), "embedding batch");
            let rows = tokio::time::timeout(self.timeout, provider.embed_batch(batch))
                .await
                .map_err(|_| EmbeddingError::Timeout(self.timeout))??;
            if rows.len() != batch.len() {
                return Err(EmbeddingError::RowCount {
                    expected: batch.len(),
                    actual: rows.len(),
                });
            }
            vectors.extend(rows);
        }

        check_dimensions(&vectors)?;
        Ok(vectors)
    }

    fn embed_lexical(&self, texts: &[String]) -> Result<Embedded, EmbeddingError> {
        let vectors = self.lexical.fit_transform(texts)?;
        tracing::info!(
            count = vectors.len(),
            dimension = vectors.first().map_or(0, Vec::len),
            "generated lexical vectors"
        );
        Ok(Embedded {
            vectors,
            source: LEXICAL_SOURCE.to_string(),
        })
    }
}

fn check_dimensions(vectors: &[Vec<f32>]) -> Result<(), EmbeddingError> {
    let Some(first) = vectors.first() else {
        return Err(EmbeddingError::EmptyResult);
    };
    let expected = first.len();
    if expected == 0 {
        return Err(EmbeddingError::EmptyResult);
    }
    for row in vectors {
        if row.len() != expected {
            return Err(EmbeddingError::Dimension {
                expected,
                actual: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::EmbedFailed("non-finite value in vector".into()));
        }
    }
    Ok(())
}
