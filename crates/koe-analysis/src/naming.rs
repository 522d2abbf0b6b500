//! Cluster naming.
//!
//! Each topic cluster is represented by the texts closest to its centroid.
//! Clusters are named in batches, with at most `max_workers` batches in
//! flight. Every returned name passes through [`accept_label`]; anything
//! rejected, missing, or lost to a failed batch becomes `Group {id}`. The
//! small-voice sentinel always gets the reserved label and is never sent to
//! the model.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use koe_config::{NamingConfig, is_placeholder_label};
use koe_core::entities::{ClusterId, ClusterLabel};
use koe_core::quality::Graded;
use koe_core::text::char_len;
use koe_llm::parse::find_array_field;
use koe_llm::{LlmError, TextGenerator, generate_with_timeout};
use serde_json::Value;

use crate::linalg::{centroid, squared_euclidean};
use crate::prompts::{self, ClusterSamples};

/// Quote characters stripped from both ends of a generated name.
const QUOTES: &[char] = &['"', '\'', '「', '」', '『', '』', '“', '”'];

/// Clean up a generated name, or `None` when it must be replaced: empty,
/// longer than `max_chars`, a numbered placeholder, or equal to the reserved
/// small-voice label.
#[must_use]
pub fn accept_label(raw: &str, max_chars: usize, reserved: &str) -> Option<String> {
    let name = raw.trim().trim_matches(QUOTES).trim();
    if name.is_empty() || char_len(name) > max_chars {
        return None;
    }
    if is_placeholder_label(name) {
        return None;
    }
    let reserved = reserved.trim();
    if name == reserved || name.eq_ignore_ascii_case(reserved) {
        return None;
    }
    Some(name.to_string())
}

/// Indices of the `k` members closest to the cluster centroid, nearest first
/// (ties keep input order).
#[must_use]
pub fn representative_members(vectors: &[Vec<f32>], members: &[usize], k: usize) -> Vec<usize> {
    let dim = members.first().map_or(0, |&i| vectors[i].len());
    let center = centroid(vectors, members, dim);
    let mut ranked: Vec<(usize, f32)> = members
        .iter()
        .map(|&i| (i, squared_euclidean(&vectors[i], &center)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().take(k).map(|(i, _)| i).collect()
}

#[derive(Debug, Default)]
struct BatchNames {
    names: BTreeMap<ClusterId, String>,
    rejected: usize,
    error: Option<String>,
}

pub struct ClusterNamer {
    generator: Arc<dyn TextGenerator>,
    config: NamingConfig,
    language: String,
    timeout: Duration,
}

impl ClusterNamer {
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        config: NamingConfig,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            config,
            language: language.into(),
            timeout,
        }
    }

    /// One label per distinct id in `labels`, sorted by id.
    ///
    /// `texts` and `vectors` are index-aligned with `labels`. Degraded when
    /// any batch failed; the affected clusters carry fallback names.
    pub async fn name_clusters(
        &self,
        labels: &[ClusterId],
        texts: &[String],
        vectors: &[Vec<f32>],
        theme: &str,
    ) -> Graded<Vec<ClusterLabel>> {
        let mut members: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();
        for (i, &id) in labels.iter().enumerate() {
            members.entry(id).or_default().push(i);
        }

        let mut out: BTreeMap<ClusterId, ClusterLabel> = BTreeMap::new();
        if let Some(noise) = members.get(&ClusterId::NOISE) {
            out.insert(
                ClusterId::NOISE,
                ClusterLabel::reserved(&self.config.small_voice_label, noise.len()),
            );
        }

        let aligned = vectors.len() == texts.len();
        let samples: Vec<ClusterSamples> = members
            .iter()
            .filter(|(id, _)| !id.is_noise())
            .map(|(&id, idx)| {
                let picked = if aligned {
                    representative_members(vectors, idx, self.config.samples_per_cluster)
                } else {
                    idx.iter().copied().take(self.config.samples_per_cluster).collect()
                };
                ClusterSamples {
                    id,
                    samples: picked.into_iter().map(|i| texts[i].clone()).collect(),
                }
            })
            .collect();

        if samples.is_empty() {
            return Graded::healthy(out.into_values().collect());
        }

        let batches: Vec<Vec<ClusterSamples>> = samples
            .chunks(self.config.batch_size.max(1))
            .map(<[ClusterSamples]>::to_vec)
            .collect();
        let batch_count = batches.len();
        tracing::info!(
            clusters = samples.len(),
            batches = batch_count,
            workers = self.config.max_workers,
            "naming clusters"
        );

        let results: Vec<BatchNames> = stream::iter(batches)
            .map(|batch| self.name_batch(theme, batch))
            .buffer_unordered(self.config.max_workers.max(1))
            .collect()
            .await;

        let mut generated = BTreeMap::new();
        let mut failures = Vec::new();
        let mut rejected = 0;
        for result in results {
            generated.extend(result.names);
            rejected += result.rejected;
            failures.extend(result.error);
        }

        for (&id, idx) in members.iter().filter(|(id, _)| !id.is_noise()) {
            let label = match generated.remove(&id) {
                Some(name) => ClusterLabel::generated(id, name, idx.len()),
                None => ClusterLabel::fallback(id, idx.len()),
            };
            out.insert(id, label);
        }
        if rejected > 0 {
            tracing::debug!(rejected, "generated names replaced by fallbacks");
        }

        let labels = out.into_values().collect();
        if failures.is_empty() {
            Graded::healthy(labels)
        } else {
            Graded::degraded(
                labels,
                format!(
                    "{} of {batch_count} naming batches failed: {}",
                    failures.len(),
                    failures.join("; ")
                ),
            )
        }
    }

    async fn name_batch(&self, theme: &str, batch: Vec<ClusterSamples>) -> BatchNames {
        let wanted: BTreeSet<ClusterId> = batch.iter().map(|c| c.id).collect();
        let prompt =
            prompts::cluster_naming(theme, &self.language, self.config.max_label_chars, &batch);

        let parsed = match generate_with_timeout(self.generator.as_ref(), &prompt, self.timeout)
            .await
            .and_then(|text| parse_names(&text))
        {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, clusters = wanted.len(), "naming batch failed");
                return BatchNames {
                    error: Some(e.to_string()),
                    ..BatchNames::default()
                };
            }
        };

        let mut out = BatchNames::default();
        for (id, raw) in parsed {
            if !wanted.contains(&id) || out.names.contains_key(&id) {
                continue;
            }
            match accept_label(
                &raw,
                self.config.max_label_chars,
                &self.config.small_voice_label,
            ) {
                Some(name) => {
                    out.names.insert(id, name);
                }
                None => {
                    tracing::debug!(%id, name = %raw, "rejected generated name");
                    out.rejected += 1;
                }
            }
        }
        out
    }
}

/// `(id, name)` pairs from a `{"clusters": [{"id", "name"}]}` response. Ids
/// may arrive as numbers or numeric strings.
fn parse_names(text: &str) -> Result<Vec<(ClusterId, String)>, LlmError> {
    let items = find_array_field(text, "clusters")?;
    Ok(items
        .iter()
        .filter_map(|item| {
            let id = match item.get("id")? {
                Value::Number(n) => n.as_i64()?,
                Value::String(s) => s.trim().parse().ok()?,
                _ => return None,
            };
            let name = item.get("name")?.as_str()?;
            Some((ClusterId(i32::try_from(id).ok()?), name.to_string()))
        })
        .collect())
}
