//! Scenario: combining two label maps

use crate::helpers::*;
use labelpipe::core::{CombineParams, ProcessOutcome, ProcessState, StageKind};
use labelpipe::execution::{verify_pipeline, FileVerifier, PipelineExecutor, PipelineRequest, VerifyError};

#[tokio::test]
async fn test_combination_produces_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ab.nii");
    let spec = build_offline(&PipelineRequest::Combine(CombineParams::new("a.nii", "b.nii", &output)));

    assert_kinds(&spec, &[StageKind::LabelCombine]);
    let executor = PipelineExecutor::new(RecordingRunner::producing_outputs());
    let result = executor.execute(&spec).await;

    assert!(result.success);
    assert_eq!(verify_pipeline(&FileVerifier, &spec).unwrap(), output.as_path());
}

/// A missing tool fails at spawn time and the verifier reports the missing output
#[tokio::test]
async fn test_missing_tool_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ab.nii");
    let spec = build_offline(&PipelineRequest::Combine(CombineParams::new("a.nii", "b.nii", &output)));

    let unresolved: Vec<_> = spec.unresolved_tools().iter().map(|tool| tool.name().to_string()).collect();
    assert_eq!(unresolved, vec!["ImageLabelCombine"]);

    let runner = RecordingRunner::producing_outputs()
        .with_outcome(StageKind::LabelCombine, ProcessOutcome::spawn_error("ImageLabelCombine was not found"));
    let result = PipelineExecutor::new(runner).execute(&spec).await;

    assert!(!result.success);
    assert_eq!(result.outcomes[0].outcome.state, ProcessState::SpawnError);
    assert!(matches!(verify_pipeline(&FileVerifier, &spec), Err(VerifyError::Missing(_))));
}
