//! Provider wiring from configuration.
//!
//! Picks the embedding backend and the text generator for one process. The
//! Gemini client serves both roles when an API key is configured and the
//! run is not offline.

use std::sync::Arc;

use koe_config::{EmbeddingBackend, KoeConfig};
use koe_embeddings::{Embedder, EmbeddingProvider, LocalEmbedder, ModelHandle};
use koe_llm::{DisabledGenerator, GeminiClient, TextGenerator};

/// Embedder and generator ready for an [`crate::Analyzer`].
#[derive(Clone)]
pub struct Providers {
    pub embedder: Embedder,
    pub generator: Arc<dyn TextGenerator>,
}

impl Providers {
    /// Resolve providers for `config`. `offline` disables every network
    /// provider: generation is disabled and remote embeddings are replaced
    /// by the local model.
    #[must_use]
    pub fn from_config(config: &KoeConfig, offline: bool) -> Self {
        Self::with_model(config, offline, ModelHandle::global())
    }

    /// Same as [`Self::from_config`] with an explicit local model slot.
    #[must_use]
    pub fn with_model(config: &KoeConfig, offline: bool, model: ModelHandle) -> Self {
        let gemini = remote_client(config, offline);

        let generator: Arc<dyn TextGenerator> = match &gemini {
            Some(client) => Arc::clone(client) as Arc<dyn TextGenerator>,
            None if offline => Arc::new(DisabledGenerator::new("offline mode")),
            None => Arc::new(DisabledGenerator::new("no API key configured")),
        };

        let remote = gemini.map(|client| client as Arc<dyn EmbeddingProvider>);
        let local = || -> Arc<dyn EmbeddingProvider> {
            Arc::new(LocalEmbedder::new(model.clone(), &config.embedding))
        };
        let provider = match config.embedding.backend {
            EmbeddingBackend::Lexical => None,
            EmbeddingBackend::Local => Some(local()),
            EmbeddingBackend::Auto => Some(remote.unwrap_or_else(local)),
            EmbeddingBackend::Remote => Some(remote.unwrap_or_else(|| {
                tracing::warn!("remote embeddings unavailable, using the local model");
                local()
            })),
        };

        let embedder = Embedder::new(provider, &config.embedding, config.provider.timeout());
        tracing::debug!(
            backend = %config.embedding.backend,
            embedder = embedder.primary_name(),
            generator = generator.name(),
            offline,
            "providers resolved"
        );
        Self { embedder, generator }
    }
}

fn remote_client(config: &KoeConfig, offline: bool) -> Option<Arc<GeminiClient>> {
    if offline || !config.provider.is_configured() {
        return None;
    }
    match GeminiClient::new(&config.provider) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "could not build the Gemini client");
            None
        }
    }
}
