//! Local embedding engine backed by fastembed (ONNX runtime).
//!
//! Uses [`ParaphraseMLMiniLML12V2`](fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
//! (paraphrase-multilingual-MiniLM-L12-v2):
//! - 384-dimensional output vectors
//! - multilingual, including Japanese survey text
//! - cached at `~/.koe/cache/fastembed/` by default
//!
//! The model is expensive to load, so it lives behind a [`ModelHandle`]: a
//! lazily initialized, process-wide slot. Tests construct their own handle
//! instead of touching [`ModelHandle::global`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use koe_config::EmbeddingConfig;

use crate::EmbeddingProvider;
use crate::error::EmbeddingError;

/// Local embedding engine.
///
/// [`TextEmbedding::embed`] requires `&mut self`; share the engine through
/// [`ModelHandle`], which wraps it in a `Mutex`.
pub struct EmbeddingEngine {
    model: TextEmbedding,
}

impl EmbeddingEngine {
    /// Load the model, downloading it into `cache_dir` on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::InitFailed`] if model download or ONNX initialization fails.
    pub fn new(cache_dir: PathBuf, show_download_progress: bool) -> Result<Self, EmbeddingError> {
        tracing::info!(cache_dir = %cache_dir.display(), "loading local embedding model");
        let model = TextEmbedding::try_new(
            TextInitOptions::new(EmbeddingModel::ParaphraseMLMiniLML12V2)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        Ok(Self { model })
    }

    /// Embed a batch of texts. Returns one 384-dim vector per input.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::EmbedFailed`] if the ONNX inference fails.
    pub fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::EmbedFailed(e.to_string()))
    }

    /// Embedding vector dimensionality.
    #[must_use]
    pub const fn dimension() -> usize {
        384
    }
}

/// Lazily initialized, shareable slot for one [`EmbeddingEngine`].
///
/// Cloning shares the slot. A failed load is not cached: the next call tries
/// again.
#[derive(Clone, Default)]
pub struct ModelHandle {
    inner: Arc<HandleInner>,
}

#[derive(Default)]
struct HandleInner {
    engine: OnceLock<Arc<Mutex<EmbeddingEngine>>>,
    loading: Mutex<()>,
}

static GLOBAL_MODEL: OnceLock<ModelHandle> = OnceLock::new();

impl ModelHandle {
    /// A fresh, empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide handle.
    pub fn global() -> Self {
        GLOBAL_MODEL.get_or_init(Self::new).clone()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.engine.get().is_some()
    }

    /// Return the engine, loading it on first use.
    ///
    /// Blocking: call from a blocking context.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::InitFailed`] if loading fails.
    pub fn get_or_load(
        &self,
        cache_dir: PathBuf,
        show_download_progress: bool,
    ) -> Result<Arc<Mutex<EmbeddingEngine>>, EmbeddingError> {
        if let Some(engine) = self.inner.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let _loading = self
            .inner
            .loading
            .lock()
            .map_err(|_| EmbeddingError::InitFailed("model loader lock poisoned".into()))?;
        if let Some(engine) = self.inner.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let engine = Arc::new(Mutex::new(EmbeddingEngine::new(
            cache_dir,
            show_download_progress,
        )?));
        Ok(Arc::clone(self.inner.engine.get_or_init(|| engine)))
    }
}

/// [`EmbeddingProvider`] over the local fastembed model.
#[derive(Clone)]
pub struct LocalEmbedder {
    handle: ModelHandle,
    cache_dir: PathBuf,
    show_download_progress: bool,
}

impl LocalEmbedder {
    #[must_use]
    pub fn new(handle: ModelHandle, config: &EmbeddingConfig) -> Self {
        Self {
            handle,
            cache_dir: config.resolved_cache_dir(),
            show_download_progress: config.show_download_progress,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    fn name(&self) -> &str {
        "local:paraphrase-multilingual-MiniLM-L12-v2"
    }

    fn max_batch_size(&self) -> usize {
        100
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let handle = self.handle.clone();
        let cache_dir = self.cache_dir.clone();
        let show_progress = self.show_download_progress;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let engine = handle.get_or_load(cache_dir, show_progress)?;
            let mut engine = engine
                .lock()
                .map_err(|_| EmbeddingError::EmbedFailed("model lock poisoned".into()))?;
            engine.embed_batch(&texts)
        })
        .await
        .map_err(|e| EmbeddingError::EmbedFailed(format!("embedding task failed: {e}")))?
    }
}
