use koe_core::entities::{
    AnalysisReport, AnalysisRequest, CommentSummary, SurveyRecommendations, ThreadComment,
    ThreadSummary,
};
use schemars::schema_for;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{SchemaArgs, SchemaTarget};
use crate::output;

/// Handle `koe schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    output::write_text(&serde_json::to_string_pretty(&schema(args.target))?, flags)
}

fn schema(target: SchemaTarget) -> serde_json::Value {
    let schema = match target {
        SchemaTarget::Request => schema_for!(AnalysisRequest),
        SchemaTarget::Report => schema_for!(AnalysisReport),
        SchemaTarget::ThreadComment => schema_for!(ThreadComment),
        SchemaTarget::CommentSummary => schema_for!(CommentSummary),
        SchemaTarget::ThreadSummary => schema_for!(ThreadSummary),
        SchemaTarget::SurveyRecommendations => schema_for!(SurveyRecommendations),
    };
    schema.to_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;
    use serde_json::json;

    #[test]
    fn every_target_is_a_valid_schema() {
        for target in SchemaTarget::value_variants() {
            let schema = schema(*target);
            assert!(
                jsonschema::validator_for(&schema).is_ok(),
                "{target:?} schema should compile"
            );
        }
    }

    #[test]
    fn thread_input_schema_accepts_jsonl_rows() {
        let validator = jsonschema::validator_for(&schema(SchemaTarget::ThreadComment)).unwrap();
        assert!(validator.is_valid(&json!({"author": "Aki", "content": "Shall we?"})));
        assert!(!validator.is_valid(&json!({"author": "Aki"})));
    }

    #[test]
    fn report_schema_accepts_an_empty_report() {
        let validator = jsonschema::validator_for(&schema(SchemaTarget::Report)).unwrap();
        let report = serde_json::to_value(AnalysisReport::empty()).unwrap();
        assert!(validator.is_valid(&report));
    }
}
