//! # koe-core
//!
//! Core types, quality grading, and error types for the koe analysis pipeline.
//!
//! This crate provides the foundational types shared across all koe crates:
//! - Entity structs for pipeline inputs and outputs (text units, cluster labels,
//!   projected points, agenda items, per-text records, the full report)
//! - Summarizer output shapes (comment summaries, thread next steps, survey
//!   recommendations)
//! - Enums for urgency, label provenance, clustering method, and pipeline stages
//! - [`quality::Graded`], the explicit "value plus degradation flag" return type
//! - Cross-cutting error types
//! - Small text helpers (char-safe truncation)

pub mod entities;
pub mod enums;
pub mod errors;
pub mod quality;
pub mod text;
