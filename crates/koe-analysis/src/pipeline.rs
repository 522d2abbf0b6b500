//! The analysis pipeline.
//!
//! ```text
//! texts ─► embed ─► distances ─┬─► outlier scores ─► split ─► cluster inliers ─┐
//!                              └─► projection ─────────────────────────────────┤
//!                                                                              ▼
//!                                         name clusters ∥ sentiment ─► records ─► agenda
//! ```
//!
//! CPU-bound stages run on the blocking pool; grouping and projection share
//! one distance matrix and run concurrently. Provider failures never abort a run: each stage returns a
//! [`Graded`](koe_core::quality::Graded) value and degraded stages are listed on the report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use koe_config::KoeConfig;
use koe_core::entities::{
    AnalysisRecord, AnalysisReport, AnalysisRequest, ClusterId, ClusterLabel, ProjectedPoint,
    TextUnit,
};
use koe_core::enums::{ClusterMethod, Stage};
use koe_core::quality::Degradation;
use koe_core::text::truncate_chars;
use koe_embeddings::Embedder;
use koe_llm::TextGenerator;

use crate::cluster::ClusterEngine;
use crate::error::AnalysisError;
use crate::issues::IssueSynthesizer;
use crate::naming::ClusterNamer;
use crate::linalg::DistanceMatrix;
use crate::outlier::{score_outliers_with, split_outliers};
use crate::projection::Projector;
use crate::providers::Providers;
use crate::sentiment::{SentimentScorer, mean_by_cluster};
use crate::summarize::Summarizer;

/// Cluster assignment of every input text.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Index-aligned with the input; `-1` for small voices.
    pub labels: Vec<ClusterId>,
    pub method: ClusterMethod,
    pub outliers: usize,
}

/// Score outliers, set them aside as small voices, and cluster the rest.
///
/// Blocking: CPU-bound.
#[must_use]
pub fn assign_clusters(vectors: &[Vec<f32>], config: &KoeConfig) -> Assignment {
    assign_clusters_with(vectors, &DistanceMatrix::euclidean(vectors), config)
}

/// [`assign_clusters`] over a precomputed distance matrix of `vectors`.
///
/// Clustering reuses the inlier rows of `dist`.
#[must_use]
pub fn assign_clusters_with(
    vectors: &[Vec<f32>],
    dist: &DistanceMatrix,
    config: &KoeConfig,
) -> Assignment {
    let seed = config.general.seed;
    let scores = score_outliers_with(vectors, dist, &config.outlier, seed);
    let split = split_outliers(&scores, &config.outlier);
    let inliers = split.inlier_indices();
    tracing::debug!(
        n = vectors.len(),
        outliers = split.outlier_count(),
        threshold = split.threshold,
        forced = split.forced,
        "outlier split"
    );

    let inlier_vectors: Vec<Vec<f32>> = inliers.iter().map(|&i| vectors[i].clone()).collect();
    let outcome = ClusterEngine::new(config.clustering.clone(), seed)
        .cluster_with(&inlier_vectors, &dist.subset(&inliers));

    let mut labels = vec![ClusterId::NOISE; vectors.len()];
    for (&index, &label) in inliers.iter().zip(&outcome.labels) {
        labels[index] = ClusterId(label);
    }
    Assignment {
        labels,
        method: outcome.method,
        outliers: split.outlier_count(),
    }
}

/// Runs analyses with one configuration and one set of providers.
#[derive(Clone)]
pub struct Analyzer {
    config: Arc<KoeConfig>,
    embedder: Embedder,
    generator: Arc<dyn TextGenerator>,
}

impl Analyzer {
    #[must_use]
    pub fn new(config: KoeConfig, embedder: Embedder, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            config: Arc::new(config),
            embedder,
            generator,
        }
    }

    /// Analyzer with providers resolved from `config`.
    #[must_use]
    pub fn from_config(config: KoeConfig, offline: bool) -> Self {
        let Providers {
            embedder,
            generator,
        } = Providers::from_config(&config, offline);
        Self::new(config, embedder, generator)
    }

    #[must_use]
    pub fn config(&self) -> &KoeConfig {
        &self.config
    }

    /// Summarizer sharing this analyzer's generator and language.
    #[must_use]
    pub fn summarizer(&self) -> Summarizer {
        Summarizer::new(
            Arc::clone(&self.generator),
            self.config.general.language.clone(),
            self.config.provider.timeout(),
        )
    }

    /// Full analysis: per-text records, cluster labels, and the agenda.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidRequest`] for blank texts or misaligned
    /// timestamps, [`AnalysisError::Task`] if a blocking stage panicked.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        let mut report = self.cluster_texts(request).await?;
        if report.is_empty() {
            return Ok(report);
        }

        let start = Instant::now();
        let synthesizer = IssueSynthesizer::new(
            Arc::clone(&self.generator),
            self.config.issues.clone(),
            self.config.naming.small_voice_label.clone(),
            self.config.general.language.clone(),
            self.config.provider.timeout(),
        );
        let (issues, degradation) = synthesizer
            .synthesize(&report.records, request.theme_or_default())
            .await
            .into_parts(Stage::Issues);
        report.issues = issues;
        report.degradations.extend(degradation);
        tracing::info!(
            items = report.issues.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "issues stage finished"
        );
        Ok(report)
    }

    /// Records and labels without the agenda.
    ///
    /// # Errors
    ///
    /// Same as [`Self::analyze`].
    pub async fn cluster_texts(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisReport, AnalysisError> {
        let units = request.text_units()?;
        if units.is_empty() {
            return Ok(AnalysisReport::empty());
        }
        let run_start = Instant::now();
        let theme = request.theme_or_default();
        let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
        let mut degradations = Vec::new();
        tracing::info!(count = texts.len(), theme, "analysis started");

        let start = Instant::now();
        let (embedded, degradation) = self.embedder.embed(&texts).await.into_parts(Stage::Embedding);
        degradations.extend(degradation);
        if embedded.is_empty() {
            tracing::warn!("no vectors produced, returning an empty report");
            return Ok(AnalysisReport {
                embedding_source: embedded.source,
                degradations,
                ..AnalysisReport::empty()
            });
        }
        ensure_rows("embedder", texts.len(), embedded.vectors.len())?;
        tracing::info!(
            source = %embedded.source,
            dimension = embedded.dimension(),
            elapsed_ms = start.elapsed().as_millis(),
            "embedding stage finished"
        );

        let start = Instant::now();
        let vectors = Arc::new(embedded.vectors);
        let dist = Arc::new(
            tokio::task::spawn_blocking({
                let vectors = Arc::clone(&vectors);
                move || DistanceMatrix::euclidean(&vectors)
            })
            .await?,
        );
        let (assignment, projection) = tokio::join!(
            tokio::task::spawn_blocking({
                let vectors = Arc::clone(&vectors);
                let dist = Arc::clone(&dist);
                let config = Arc::clone(&self.config);
                move || assign_clusters_with(&vectors, &dist, &config)
            }),
            tokio::task::spawn_blocking({
                let vectors = Arc::clone(&vectors);
                let dist = Arc::clone(&dist);
                let projector =
                    Projector::new(self.config.projection.clone(), self.config.general.seed);
                move || projector.project_with(&vectors, &dist)
            }),
        );
        let assignment = assignment?;
        let (points, degradation) = projection?.into_parts(Stage::Projection);
        degradations.extend(degradation);
        ensure_rows("cluster engine", texts.len(), assignment.labels.len())?;
        ensure_rows("projector", texts.len(), points.len())?;
        tracing::info!(
            method = %assignment.method,
            outliers = assignment.outliers,
            elapsed_ms = start.elapsed().as_millis(),
            "grouping stage finished"
        );

        let start = Instant::now();
        let namer = ClusterNamer::new(
            Arc::clone(&self.generator),
            self.config.naming.clone(),
            self.config.general.language.clone(),
            self.config.provider.timeout(),
        );
        let scorer = SentimentScorer::new(
            Arc::clone(&self.generator),
            self.config.sentiment.clone(),
            self.config.provider.timeout(),
        );
        let (labels, sentiment) = tokio::join!(
            namer.name_clusters(&assignment.labels, &texts, &vectors, theme),
            scorer.score(&texts),
        );
        let (mut labels, degradation) = labels.into_parts(Stage::Naming);
        degradations.extend(degradation);
        let (sentiment, degradation) = sentiment.into_parts(Stage::Sentiment);
        degradations.extend(degradation);
        tracing::info!(
            labels = labels.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "naming stage finished"
        );

        if let Some(scores) = &sentiment {
            ensure_rows("sentiment scorer", texts.len(), scores.len())?;
            let means = mean_by_cluster(&assignment.labels, scores);
            for label in &mut labels {
                label.sentiment = means.get(&label.id).copied();
            }
        }

        let records = build_records(
            units,
            &assignment.labels,
            &points,
            &labels,
            sentiment.as_deref(),
            self.config.general.summary_chars,
        );
        tracing::info!(
            records = records.len(),
            topics = labels.iter().filter(|l| !l.is_noise).count(),
            degraded = degradations.len(),
            elapsed_ms = run_start.elapsed().as_millis(),
            "analysis finished"
        );

        Ok(AnalysisReport {
            records,
            labels,
            issues: Vec::new(),
            embedding_source: embedded.source,
            cluster_method: Some(assignment.method),
            degradations,
        })
    }
}

fn ensure_rows(what: &'static str, expected: usize, actual: usize) -> Result<(), AnalysisError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AnalysisError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}

fn build_records(
    units: Vec<TextUnit>,
    assignment: &[ClusterId],
    points: &[ProjectedPoint],
    labels: &[ClusterLabel],
    sentiment: Option<&[f32]>,
    summary_chars: usize,
) -> Vec<AnalysisRecord> {
    let names: BTreeMap<ClusterId, &str> =
        labels.iter().map(|l| (l.id, l.name.as_str())).collect();

    units
        .into_iter()
        .enumerate()
        .map(|(i, unit)| {
            let id = assignment[i];
            let sub_topic = names
                .get(&id)
                .map_or_else(|| ClusterLabel::placeholder_name(id), |n| (*n).to_string());
            AnalysisRecord {
                summary: truncate_chars(&unit.text, summary_chars),
                original_text: unit.text,
                created_at: unit.created_at,
                sub_topic,
                x: points[i].x,
                y: points[i].y,
                cluster_id: id,
                is_noise: id.is_noise(),
                sentiment: sentiment.map(|s| s[i]),
            }
        })
        .collect()
}

/// Report-level degradations in stage order, for display.
#[must_use]
pub fn degradation_summary(degradations: &[Degradation]) -> Vec<String> {
    degradations
        .iter()
        .map(|d| format!("{}: {}", d.stage, d.reason))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grouped(groups: usize, size: usize) -> Vec<Vec<f32>> {
        (0..groups * size)
            .map(|i| {
                let mut v = vec![0.0; 4];
                v[i / size] = 10.0;
                #[allow(clippy::cast_precision_loss)]
                let jitter = (i % size) as f32 * 0.01;
                v[3] += jitter;
                v
            })
            .collect()
    }

    #[test]
    fn tiny_input_is_one_cluster() {
        let assignment = assign_clusters(&[vec![1.0, 2.0]], &KoeConfig::default());
        assert_eq!(assignment.labels, vec![ClusterId(0)]);
        assert_eq!(assignment.method, ClusterMethod::Trivial);
        assert_eq!(assignment.outliers, 0);
    }

    #[test]
    fn noise_only_where_flagged_or_density_noise() {
        let mut vectors = grouped(3, 15);
        vectors.push(vec![100.0, -100.0, 100.0, -100.0]);
        let assignment = assign_clusters(&vectors, &KoeConfig::default());
        assert_eq!(assignment.labels.len(), 46);
        assert!(assignment.labels[45].is_noise());
        assert!(assignment.labels.iter().filter(|l| !l.is_noise()).count() >= 30);
    }

    #[test]
    fn shared_distances_match_per_stage_distances() {
        let mut vectors = grouped(3, 15);
        vectors.push(vec![100.0, -100.0, 100.0, -100.0]);
        let config = KoeConfig::default();
        let seed = config.general.seed;

        let scores = crate::outlier::score_outliers(&vectors, &config.outlier, seed);
        let inliers = split_outliers(&scores, &config.outlier).inlier_indices();
        let inlier_vectors: Vec<Vec<f32>> = inliers.iter().map(|&i| vectors[i].clone()).collect();
        let separate = ClusterEngine::new(config.clustering.clone(), seed).cluster(&inlier_vectors);

        let shared = assign_clusters(&vectors, &config);
        assert_eq!(shared.method, separate.method);
        let inlier_labels: Vec<ClusterId> = inliers.iter().map(|&i| shared.labels[i]).collect();
        let expected: Vec<ClusterId> = separate.labels.iter().map(|&l| ClusterId(l)).collect();
        assert_eq!(inlier_labels, expected);
    }

    #[test]
    fn records_follow_input_order() {
        let units = vec![
            TextUnit {
                text: "first comment that is rather long".into(),
                created_at: None,
            },
            TextUnit {
                text: "second".into(),
                created_at: None,
            },
        ];
        let labels = vec![
            ClusterLabel::reserved("Small Voice", 1),
            ClusterLabel::generated(ClusterId(0), "Meetings".into(), 1),
        ];
        let records = build_records(
            units,
            &[ClusterId(0), ClusterId::NOISE],
            &[ProjectedPoint::new(1.0, 2.0), ProjectedPoint::origin()],
            &labels,
            Some(&[0.5, -0.5]),
            5,
        );
        assert_eq!(records[0].sub_topic, "Meetings");
        assert_eq!(records[0].summary, "first...");
        assert_eq!(records[0].x, 1.0);
        assert_eq!(records[0].sentiment, Some(0.5));
        assert_eq!(records[1].sub_topic, "Small Voice");
        assert!(records[1].is_noise);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        assert!(ensure_rows("projector", 3, 3).is_ok());
        assert!(matches!(
            ensure_rows("projector", 3, 2),
            Err(AnalysisError::ShapeMismatch { expected: 3, actual: 2, .. })
        ));
    }
}
