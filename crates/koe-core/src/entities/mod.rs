//! Entity structs for the koe analysis pipeline.
//!
//! Inputs ([`TextUnit`], [`AnalysisRequest`]), intermediate results
//! ([`ClusterId`], [`ClusterLabel`], [`ProjectedPoint`]) and outputs
//! ([`AnalysisRecord`], [`AnalysisReport`], [`IssueAgendaItem`], summaries).
//! Output structs derive `Serialize`, `Deserialize`, and `JsonSchema` for
//! JSON roundtrip and schema validation.

mod cluster;
mod issue;
mod point;
mod record;
mod request;
mod summary;

pub use cluster::{ClusterId, ClusterLabel};
pub use issue::IssueAgendaItem;
pub use point::ProjectedPoint;
pub use record::{AnalysisRecord, AnalysisReport};
pub use request::{AnalysisRequest, TextUnit};
pub use summary::{
    CommentSummary, NextStep, SurveyRecommendation, SurveyRecommendations, ThreadComment,
    ThreadSummary,
};
