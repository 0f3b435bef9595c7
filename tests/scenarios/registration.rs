//! Scenario: masked registration and resampling

use crate::helpers::*;
use labelpipe::core::{RegistrationFamily, RegistrationParams, StageKind, ToolNames};
use labelpipe::execution::{
    verify_pipeline, BuildError, FileVerifier, PipelineBuilder, PipelineExecutor, PipelineRequest,
};
use labelpipe::process::ToolLocator;

/// Rigid registration with a label output builds exactly two stages
#[test]
fn test_rigid_with_segmentation_builds_two_stages() {
    let params = RegistrationParams::new("moving.nii", "fixed.nii")
        .with_masks("m.nii", "f.nii")
        .with_transform("t.tfm")
        .with_family(RegistrationFamily::Rigid)
        .with_segmentation("seg.nii", "seg_out.nii");

    let spec = build_offline(&PipelineRequest::Register(params));

    assert_kinds(&spec, &[StageKind::Registration, StageKind::LabelResample]);
    let registration = spec.stage(StageKind::Registration).unwrap();
    assert!(registration.has_flag("--useRigid"));
    assert_eq!(registration.value_of("--movingBinaryVolume"), Some("m.nii"));
    assert_eq!(registration.value_of("--fixedBinaryVolume"), Some("f.nii"));

    let resample = spec.stage(StageKind::LabelResample).unwrap();
    assert_eq!(
        resample.arguments,
        vec!["--interpolation", "nn", "--transformationFile", "t.tfm", "seg.nii", "seg_out.nii"]
    );
    assert_eq!(spec.artifact().unwrap().to_str(), Some("seg_out.nii"));
}

/// The same request with the transform or label input left out never builds
#[test]
fn test_rigid_with_segmentation_needs_transform_and_input() {
    let base = || {
        RegistrationParams::new("moving.nii", "fixed.nii")
            .with_masks("m.nii", "f.nii")
            .with_family(RegistrationFamily::Rigid)
    };
    let build = |params: RegistrationParams| {
        let mut locator = ToolLocator::with_dirs(vec![]);
        PipelineBuilder::new(&mut locator, ToolNames::default()).build(&PipelineRequest::Register(params))
    };

    let no_transform = base().with_segmentation("seg.nii", "seg_out.nii");
    assert_eq!(build(no_transform).unwrap_err(), BuildError::MissingTransform);

    let mut no_input = base().with_transform("t.tfm");
    no_input.segmentation_out = Some("seg_out.nii".into());
    assert_eq!(build(no_input).unwrap_err(), BuildError::MissingSegmentation);
}

/// Empty mask paths count as absent: only the volume is resampled
#[test]
fn test_empty_masks_skip_registration() {
    let params = RegistrationParams::new("moving.nii", "fixed.nii")
        .with_masks("", "")
        .with_output_volume("out.nii");

    let spec = build_offline(&PipelineRequest::Register(params));

    assert_kinds(&spec, &[StageKind::VolumeResample]);
    let stage = spec.stage(StageKind::VolumeResample).unwrap();
    assert!(!stage.has_flag("--transformationFile"));
    assert_eq!(stage.arguments, vec!["--interpolation", "nn", "moving.nii", "out.nii"]);
}

/// One mask without the other does not trigger registration
#[test]
fn test_single_mask_skips_registration() {
    let params = RegistrationParams::new("moving.nii", "fixed.nii")
        .with_masks("m.nii", "")
        .with_output_volume("out.nii");

    let spec = build_offline(&PipelineRequest::Register(params));
    assert_kinds(&spec, &[StageKind::VolumeResample]);
}

/// Affine registration runs all four stages in order and produces the label map
#[tokio::test]
async fn test_affine_pipeline_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let seg_out = dir.path().join("seg_out.nii");
    let out = dir.path().join("out.nii");
    let params = RegistrationParams::new("moving.nii", "fixed.nii")
        .with_masks("m.nii", "f.nii")
        .with_transform("t.tfm")
        .with_family(RegistrationFamily::Affine)
        .with_segmentation("seg.nii", &seg_out)
        .with_output_volume(&out);

    let spec = build_offline(&PipelineRequest::Register(params));
    let executor = PipelineExecutor::new(RecordingRunner::producing_outputs());
    let result = executor.execute(&spec).await;

    assert!(result.success);
    assert_eq!(
        executor.runner().ran_kinds(),
        vec![
            StageKind::Registration,
            StageKind::Refinement,
            StageKind::LabelResample,
            StageKind::VolumeResample,
        ]
    );
    assert!(out.exists());
    assert_eq!(verify_pipeline(&FileVerifier, &spec).unwrap(), seg_out.as_path());
}

/// Full run through real child processes standing in for the tools
#[cfg(unix)]
#[tokio::test]
async fn test_registration_with_installed_tools() {
    use labelpipe::process::{ProcessRunner, RunOptions};
    use std::sync::Arc;
    use std::time::Duration;

    let tools = tempfile::tempdir().unwrap();
    install_fake_tools(tools.path());
    let work = tempfile::tempdir().unwrap();
    let seg_out = work.path().join("seg_out.nii");
    let params = RegistrationParams::new(work.path().join("moving.nii"), work.path().join("fixed.nii"))
        .with_masks("m.nii", "f.nii")
        .with_transform(work.path().join("t.tfm"))
        .with_segmentation("seg.nii", &seg_out);

    let spec = build_with_tools(&PipelineRequest::Register(params), tools.path());
    assert!(spec.unresolved_tools().is_empty());

    let callback = Arc::new(RecordingCallback::default());
    let runner = ProcessRunner::new(RunOptions::default().with_poll_interval(Duration::from_millis(10)));
    let executor = PipelineExecutor::new(runner).with_progress(callback.clone());
    let result = executor.execute(&spec).await;

    assert!(result.success, "{:?}", result.failures());
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(callback.markers(), vec!["DRegistering", "DRegistering"]);
    assert!(verify_pipeline(&FileVerifier, &spec).is_ok());
}
