//! Pipeline construction from caller parameters
//!
//! All branching over input combinations lives here. The builder decides
//! which stages exist and what their argument vectors are; nothing
//! downstream adds, drops or reorders stages.

use crate::core::{
    params::REFINEMENT_TUNING, CombineParams, Interpolation, PipelineSpec, RegistrationParams,
    StageKind, StageSpec, ToolNames, ToolPath, Tuning,
};
use crate::process::ToolLocator;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Inputs that cannot form a valid pipeline
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("registration requires a transform path to write to")]
    MissingTransform,

    #[error("a segmentation output was requested without an input segmentation")]
    MissingSegmentation,

    #[error("{0} must not be empty")]
    EmptyPath(&'static str),

    #[error("no output requested: set a segmentation output or an output volume")]
    NoOutputs,
}

/// Which pipeline to build
#[derive(Debug, Clone)]
pub enum PipelineRequest {
    /// Masked registration followed by label and volume resampling
    Register(RegistrationParams),
    /// Combination of two label maps
    Combine(CombineParams),
}

/// Builds the stage list for a request, resolving each tool once.
pub struct PipelineBuilder<'a> {
    locator: &'a mut ToolLocator,
    tools: ToolNames,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(locator: &'a mut ToolLocator, tools: ToolNames) -> Self {
        Self { locator, tools }
    }

    pub fn build(&mut self, request: &PipelineRequest) -> Result<PipelineSpec, BuildError> {
        match request {
            PipelineRequest::Register(params) => self.build_registration(params),
            PipelineRequest::Combine(params) => self.build_combination(params),
        }
    }

    /// Stages, in order: registration, refinement, label resample, volume resample.
    pub fn build_registration(
        &mut self,
        params: &RegistrationParams,
    ) -> Result<PipelineSpec, BuildError> {
        let segmentation_out = params.segmentation_out();
        let output_volume = params.output_volume();
        let artifact = segmentation_out.or(output_volume).ok_or(BuildError::NoOutputs)?;

        let mut stages = Vec::new();
        let transform = params.transform();

        if let Some((moving_mask, fixed_mask)) = params.masks() {
            let transform = transform.ok_or(BuildError::MissingTransform)?;
            let masked = MaskedInputs {
                moving_mask,
                fixed_mask,
                moving_volume: non_empty(&params.moving_volume, "moving volume")?,
                fixed_volume: non_empty(&params.fixed_volume, "fixed volume")?,
            };
            let tool = self.locator.resolve(&self.tools.registration);

            stages.push(registration_stage(
                StageKind::Registration,
                tool.clone(),
                transform,
                params.family.tuning(),
                params.family.flag(),
                None,
                &masked,
            ));

            if params.family.needs_refinement() {
                stages.push(registration_stage(
                    StageKind::Refinement,
                    tool,
                    transform,
                    REFINEMENT_TUNING,
                    "--useRigid",
                    Some(transform),
                    &masked,
                ));
            }
        } else {
            debug!("Masks not supplied, skipping registration");
        }

        if let Some(output) = segmentation_out {
            let input = params.segmentation().ok_or(BuildError::MissingSegmentation)?;
            let tool = self.locator.resolve(&self.tools.resample);
            stages.push(resample_stage(
                StageKind::LabelResample,
                tool,
                Interpolation::NearestNeighbor,
                transform,
                input,
                output,
            ));
        }

        if let Some(output) = output_volume {
            let input = non_empty(&params.moving_volume, "moving volume")?;
            let tool = self.locator.resolve(&self.tools.resample);
            stages.push(resample_stage(
                StageKind::VolumeResample,
                tool,
                params.volume_interpolation,
                transform,
                input,
                output,
            ));
        }

        Ok(PipelineSpec::new(
            "register",
            stages,
            Some(artifact.to_path_buf()),
        ))
    }

    /// A single stage: `<tool> <inputA> <inputB> <output>`
    pub fn build_combination(&mut self, params: &CombineParams) -> Result<PipelineSpec, BuildError> {
        let input_a = non_empty(&params.input_a, "first input volume")?;
        let input_b = non_empty(&params.input_b, "second input volume")?;
        let output = non_empty(&params.output, "output volume")?;

        let tool = self.locator.resolve(&self.tools.label_combine);
        let stage = StageSpec::new(StageKind::LabelCombine, tool)
            .arg(path_arg(input_a))
            .arg(path_arg(input_b))
            .arg(path_arg(output));

        Ok(PipelineSpec::new(
            "combine",
            vec![stage],
            Some(output.to_path_buf()),
        ))
    }
}

struct MaskedInputs<'p> {
    moving_mask: &'p Path,
    fixed_mask: &'p Path,
    moving_volume: &'p Path,
    fixed_volume: &'p Path,
}

fn registration_stage(
    kind: StageKind,
    tool: ToolPath,
    transform: &Path,
    tuning: Tuning,
    family_flag: &str,
    initial_transform: Option<&Path>,
    inputs: &MaskedInputs<'_>,
) -> StageSpec {
    let mut stage = StageSpec::new(kind, tool)
        .flag("--outputTransform", path_arg(transform))
        .flag("--minimumStepLength", tuning.min_step_length.to_string())
        .flag("--numberOfIterations", tuning.iterations.to_string())
        .arg(family_flag)
        .flag("--maskProcessingMode", "ROI");

    if let Some(initial) = initial_transform {
        stage = stage.flag("--initialTransform", path_arg(initial));
    }

    stage
        .flag("--movingBinaryVolume", path_arg(inputs.moving_mask))
        .flag("--fixedBinaryVolume", path_arg(inputs.fixed_mask))
        .flag("--movingVolume", path_arg(inputs.moving_volume))
        .flag("--fixedVolume", path_arg(inputs.fixed_volume))
}

/// Without a transform the resampler applies the identity.
fn resample_stage(
    kind: StageKind,
    tool: ToolPath,
    interpolation: Interpolation,
    transform: Option<&Path>,
    input: &Path,
    output: &Path,
) -> StageSpec {
    let mut stage = StageSpec::new(kind, tool).flag("--interpolation", interpolation.as_arg());
    if let Some(transform) = transform {
        stage = stage.flag("--transformationFile", path_arg(transform));
    }
    stage.arg(path_arg(input)).arg(path_arg(output))
}

fn non_empty<'p>(path: &'p Path, what: &'static str) -> Result<&'p Path, BuildError> {
    if path.as_os_str().is_empty() {
        Err(BuildError::EmptyPath(what))
    } else {
        Ok(path)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
