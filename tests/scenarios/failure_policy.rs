//! Scenario: what happens after a stage fails

use crate::helpers::*;
use labelpipe::core::{FailurePolicy, ProcessOutcome, RegistrationFamily, RegistrationParams, StageKind};
use labelpipe::execution::{verify_pipeline, FileVerifier, PipelineExecutor, PipelineRequest};

fn three_stage_request(dir: &std::path::Path) -> PipelineRequest {
    PipelineRequest::Register(
        RegistrationParams::new("moving.nii", "fixed.nii")
            .with_masks("m.nii", "f.nii")
            .with_transform("t.tfm")
            .with_family(RegistrationFamily::Rigid)
            .with_segmentation("seg.nii", dir.join("seg_out.nii"))
            .with_output_volume(dir.join("out.nii")),
    )
}

/// Default policy: a failed registration does not stop the resamples
#[tokio::test]
async fn test_best_effort_runs_remaining_stages() {
    let dir = tempfile::tempdir().unwrap();
    let spec = build_offline(&three_stage_request(dir.path()));
    assert_eq!(spec.len(), 3);

    let runner = RecordingRunner::producing_outputs().with_outcome(StageKind::Registration, ProcessOutcome::exited(1));
    let executor = PipelineExecutor::new(runner);
    let result = executor.execute(&spec).await;

    assert_eq!(executor.policy(), FailurePolicy::BestEffort);
    assert_eq!(
        result.outcomes.iter().map(|o| o.stage).collect::<Vec<_>>(),
        vec![StageKind::Registration, StageKind::LabelResample, StageKind::VolumeResample]
    );
    assert_eq!(result.outcomes[0].outcome.exit_code, Some(1));
    assert!(!result.success);
    assert_eq!(result.failures().len(), 1);

    // The artifact still decides the final verdict
    assert!(verify_pipeline(&FileVerifier, &spec).is_ok());
}

#[tokio::test]
async fn test_fail_fast_skips_remaining_stages() {
    let dir = tempfile::tempdir().unwrap();
    let spec = build_offline(&three_stage_request(dir.path()));

    let runner = RecordingRunner::producing_outputs()
        .with_outcome(StageKind::Registration, ProcessOutcome::runtime_exception("signal 11"));
    let executor = PipelineExecutor::new(runner).with_policy(FailurePolicy::FailFast);
    let result = executor.execute(&spec).await;

    assert_eq!(executor.runner().ran_kinds(), vec![StageKind::Registration]);
    assert_eq!(result.skipped, vec![StageKind::LabelResample, StageKind::VolumeResample]);
    assert!(verify_pipeline(&FileVerifier, &spec).is_err());
}

/// A label resample that fails leaves the pipeline failed even though the volume was written
#[tokio::test]
async fn test_failed_label_resample_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let spec = build_offline(&three_stage_request(dir.path()));

    let runner = RecordingRunner::producing_outputs().with_outcome(StageKind::LabelResample, ProcessOutcome::exited(2));
    let result = PipelineExecutor::new(runner).execute(&spec).await;

    assert_eq!(result.outcomes.len(), 3);
    assert!(dir.path().join("out.nii").exists());
    assert!(verify_pipeline(&FileVerifier, &spec).is_err());
}
