//! Embedder batching and fallback behavior against fake providers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use koe_config::EmbeddingConfig;
use koe_embeddings::{Embedder, EmbeddingError, EmbeddingProvider, LEXICAL_SOURCE};
use pretty_assertions::assert_eq;

/// Records batch sizes and returns `[index, len]` vectors.
#[derive(Default)]
struct RecordingProvider {
    batches: Mutex<Vec<usize>>,
    max_batch: usize,
}

#[async_trait]
impl EmbeddingProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batches.lock().unwrap().push(texts.len());
        Ok(texts
            .iter()
            .map(|t| vec![t.parse::<f32>().unwrap_or(0.0), 1.0])
            .collect())
    }
}

struct FailingProvider;

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn max_batch_size(&self) -> usize {
        100
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::EmbedFailed("quota exceeded".into()))
    }
}

struct ShortProvider;

#[async_trait]
impl EmbeddingProvider for ShortProvider {
    fn name(&self) -> &str {
        "short"
    }

    fn max_batch_size(&self) -> usize {
        100
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
    }
}

struct SlowProvider;

#[async_trait]
impl EmbeddingProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    fn max_batch_size(&self) -> usize {
        100
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![vec![1.0]; texts.len()])
    }
}

fn numbered(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

fn embedder(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Embedder {
    let config = EmbeddingConfig {
        batch_size,
        ..Default::default()
    };
    Embedder::new(Some(provider), &config, Duration::from_secs(5))
}

#[tokio::test]
async fn batches_preserve_input_order() {
    let provider = Arc::new(RecordingProvider {
        max_batch: 100,
        ..Default::default()
    });
    let embedder = embedder(provider.clone(), 4);

    let graded = embedder.embed(&numbered(10)).await;
    assert!(!graded.is_degraded());
    assert_eq!(graded.value.source, "recording");
    let firsts: Vec<f32> = graded.value.vectors.iter().map(|v| v[0]).collect();
    assert_eq!(firsts, (0..10u8).map(f32::from).collect::<Vec<_>>());
    assert_eq!(*provider.batches.lock().unwrap(), vec![4, 4, 2]);
}

#[tokio::test]
async fn provider_limit_caps_batch_size() {
    let provider = Arc::new(RecordingProvider {
        max_batch: 3,
        ..Default::default()
    });
    let embedder = embedder(provider.clone(), 100);

    embedder.embed(&numbered(7)).await;
    assert_eq!(*provider.batches.lock().unwrap(), vec![3, 3, 1]);
}

#[tokio::test]
async fn failing_provider_falls_back_to_lexical() {
    let embedder = embedder(Arc::new(FailingProvider), 100);
    let texts: Vec<String> = ["システムが遅い", "画面が重い", "もっと早くしてほしい"]
        .into_iter()
        .map(String::from)
        .collect();

    let graded = embedder.embed(&texts).await;
    assert!(graded.is_degraded());
    assert!(graded.quality.reason().unwrap().contains("quota exceeded"));
    assert_eq!(graded.value.source, LEXICAL_SOURCE);
    assert_eq!(graded.value.vectors.len(), texts.len());
}

#[tokio::test]
async fn wrong_row_count_is_a_provider_failure() {
    let embedder = embedder(Arc::new(ShortProvider), 100);
    let graded = embedder.embed(&numbered(3)).await;
    assert!(graded.is_degraded());
    assert_eq!(graded.value.source, LEXICAL_SOURCE);
    assert_eq!(graded.value.vectors.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn timeout_falls_back() {
    let config = EmbeddingConfig::default();
    let embedder = Embedder::new(Some(Arc::new(SlowProvider)), &config, Duration::from_secs(1));
    let graded = embedder.embed(&numbered(2)).await;
    assert!(graded.is_degraded());
    assert!(graded.quality.reason().unwrap().contains("timed out"));
    assert_eq!(graded.value.vectors.len(), 2);
}

#[tokio::test]
async fn both_paths_failing_yields_empty_matrix() {
    let embedder = embedder(Arc::new(FailingProvider), 100);
    let graded = embedder.embed(&["   ".to_string()]).await;
    assert!(graded.is_degraded());
    assert!(graded.value.is_empty());
}

#[tokio::test]
async fn lexical_only_is_healthy() {
    let embedder = Embedder::lexical_only(&EmbeddingConfig::default());
    let graded = embedder.embed(&["a b".to_string(), "b c".to_string()]).await;
    assert!(!graded.is_degraded());
    assert_eq!(graded.value.source, LEXICAL_SOURCE);
    assert_eq!(graded.value.vectors.len(), 2);
}

#[tokio::test]
async fn empty_input_is_empty_and_healthy() {
    let embedder = Embedder::lexical_only(&EmbeddingConfig::default());
    let graded = embedder.embed(&[]).await;
    assert!(!graded.is_degraded());
    assert!(graded.value.is_empty());
}
