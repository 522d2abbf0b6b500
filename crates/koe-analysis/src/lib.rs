//! # koe-analysis
//!
//! Grouping, projection, and LLM synthesis for koe.
//!
//! Coordinates between:
//! - Outlier scoring (isolation forest + local outlier factor vote) that sets
//!   small voices aside before clustering
//! - Density clustering (HDBSCAN) with a k-means partition fallback
//! - A 2D neighbor-graph layout with a PCA fallback
//! - Cluster naming, agenda synthesis, summaries, and optional sentiment,
//!   each behind the [`koe_llm::TextGenerator`] seam
//!
//! [`Analyzer`] runs the whole pipeline and returns an
//! [`koe_core::entities::AnalysisReport`].

pub mod cluster;
pub mod error;
pub mod issues;
pub mod linalg;
pub mod naming;
pub mod outlier;
pub mod pipeline;
pub mod projection;
pub mod prompts;
pub mod providers;
pub mod sentiment;
pub mod summarize;

pub use error::{AnalysisError, ClusterError, ProjectionError};
pub use issues::IssueSynthesizer;
pub use naming::ClusterNamer;
pub use pipeline::{Analyzer, Assignment, assign_clusters, assign_clusters_with};
pub use projection::Projector;
pub use providers::Providers;
pub use sentiment::SentimentScorer;
pub use summarize::Summarizer;
