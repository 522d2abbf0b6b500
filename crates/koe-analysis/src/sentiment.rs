//! Optional per-text sentiment scores in `[-1, 1]`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use koe_config::SentimentConfig;
use koe_core::entities::ClusterId;
use koe_core::quality::Graded;
use koe_llm::parse::find_array_field;
use koe_llm::{LlmError, TextGenerator, generate_with_timeout};
use serde_json::Value;

pub struct SentimentScorer {
    generator: Arc<dyn TextGenerator>,
    config: SentimentConfig,
    timeout: Duration,
}

impl SentimentScorer {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, config: SentimentConfig, timeout: Duration) -> Self {
        Self {
            generator,
            config,
            timeout,
        }
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// One score per text, in order. `None` when scoring is disabled or any
    /// batch fails; the latter is degraded.
    pub async fn score(&self, texts: &[String]) -> Graded<Option<Vec<f32>>> {
        if !self.config.enabled {
            return Graded::healthy(None);
        }

        let mut scores = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(self.config.batch_size.max(1)).enumerate() {
            match self.score_batch(batch).await {
                Ok(batch_scores) => scores.extend(batch_scores),
                Err(e) => {
                    tracing::warn!(batch = i, error = %e, "sentiment scoring failed");
                    return Graded::degraded(None, format!("sentiment batch {i} failed: {e}"));
                }
            }
        }
        tracing::info!(count = scores.len(), "sentiment scored");
        Graded::healthy(Some(scores))
    }

    async fn score_batch(&self, batch: &[String]) -> Result<Vec<f32>, LlmError> {
        let prompt = crate::prompts::sentiment_scores(batch);
        let text = generate_with_timeout(self.generator.as_ref(), &prompt, self.timeout).await?;
        parse_scores(&text, batch.len())
    }
}

/// Scores from `{"scores": [{"index", "score"}]}` or a bare list of numbers.
/// Every index in `0..expected` must be present.
fn parse_scores(text: &str, expected: usize) -> Result<Vec<f32>, LlmError> {
    let items = find_array_field(text, "scores")?;
    let mut slots: Vec<Option<f32>> = vec![None; expected];

    for (position, item) in items.iter().enumerate() {
        let (index, score) = match item {
            Value::Number(n) => (Some(position), n.as_f64()),
            Value::Object(_) => (
                item.get("index")
                    .and_then(Value::as_u64)
                    .and_then(|i| usize::try_from(i).ok())
                    .or(Some(position)),
                item.get("score").and_then(Value::as_f64),
            ),
            _ => (None, None),
        };
        if let (Some(index), Some(score)) = (index, score) {
            if let Some(slot) = slots.get_mut(index) {
                #[allow(clippy::cast_possible_truncation)]
                let score = score as f32;
                if score.is_finite() {
                    *slot = Some(score.clamp(-1.0, 1.0));
                }
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| LlmError::Parse(format!("no sentiment score for comment {i}"))))
        .collect()
}

/// Mean score per cluster id.
#[must_use]
pub fn mean_by_cluster(labels: &[ClusterId], scores: &[f32]) -> BTreeMap<ClusterId, f32> {
    let mut sums: BTreeMap<ClusterId, (f32, u32)> = BTreeMap::new();
    for (&id, &score) in labels.iter().zip(scores) {
        let entry = sums.entry(id).or_default();
        entry.0 += score;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(id, (sum, count))| {
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / count as f32;
            (id, mean)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGenerator {
        calls: AtomicUsize,
        response: &'static str,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.to_string())
        }
    }

    fn scorer(enabled: bool, batch_size: usize, response: &'static str) -> (SentimentScorer, Arc<CountingGenerator>) {
        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
            response,
        });
        let scorer = SentimentScorer::new(
            generator.clone(),
            SentimentConfig {
                enabled,
                batch_size,
            },
            Duration::from_secs(5),
        );
        (scorer, generator)
    }

    #[tokio::test]
    async fn disabled_scorer_makes_no_calls() {
        let (scorer, generator) = scorer(false, 50, "[]");
        let graded = scorer.score(&["fine".into()]).await;
        assert!(!graded.is_degraded());
        assert!(graded.value.is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scores_are_batched_and_clamped() {
        let (scorer, generator) = scorer(
            true,
            2,
            r#"{"scores": [{"index": 1, "score": 3.5}, {"index": 0, "score": -0.25}]}"#,
        );
        let texts: Vec<String> = ["a", "b", "c", "d"].map(String::from).to_vec();
        let graded = scorer.score(&texts).await;
        assert!(!graded.is_degraded());
        assert_eq!(graded.value, Some(vec![-0.25, 1.0, -0.25, 1.0]));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_score_degrades() {
        let (scorer, _) = scorer(true, 50, "[0.5]");
        let graded = scorer.score(&["a".into(), "b".into()]).await;
        assert!(graded.is_degraded());
        assert!(graded.value.is_none());
    }

    #[test]
    fn bare_numbers_are_positional() {
        assert_eq!(parse_scores("[0.1, -0.2]", 2).unwrap(), vec![0.1, -0.2]);
    }

    #[test]
    fn cluster_means() {
        let labels = [0, 0, -1, 1].map(ClusterId);
        let means = mean_by_cluster(&labels, &[0.5, -0.5, 1.0, 0.25]);
        assert_eq!(means[&ClusterId(0)], 0.0);
        assert_eq!(means[&ClusterId::NOISE], 1.0);
        assert_eq!(means[&ClusterId(1)], 0.25);
    }
}
