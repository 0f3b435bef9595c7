//! CLI command definitions

use crate::core::{CombineParams, FailurePolicy, Interpolation, RegistrationFamily, RegistrationParams, RunnerConfig};
use clap::Args;
use std::path::PathBuf;

/// Flags shared by every command that runs a pipeline
#[derive(Debug, Args, Clone, Default)]
pub struct RunFlags {
    /// Print the planned stages without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Output the plan or result as JSON
    #[arg(long)]
    pub json: bool,

    /// Show elapsed time while each stage runs
    #[arg(long)]
    pub progress: bool,

    /// Stop at the first failing stage instead of running the rest
    #[arg(long)]
    pub fail_fast: bool,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Kill any stage running longer than this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

impl RunFlags {
    /// Override config values with flags that were given
    pub fn apply(&self, config: &mut RunnerConfig) {
        if self.progress {
            config.emit_progress = true;
        }
        if self.fail_fast {
            config.failure_policy = FailurePolicy::FailFast;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(secs) = self.deadline_secs {
            config.deadline_secs = Some(secs);
        }
    }
}

/// Register a moving volume to a fixed one and resample outputs
#[derive(Debug, Args, Clone)]
pub struct RegisterCommand {
    /// Volume to be transformed
    #[arg(long)]
    pub moving_volume: PathBuf,

    /// Reference volume
    #[arg(long)]
    pub fixed_volume: PathBuf,

    /// Region of interest in the moving volume
    #[arg(long)]
    pub moving_mask: Option<PathBuf>,

    /// Region of interest in the fixed volume
    #[arg(long)]
    pub fixed_mask: Option<PathBuf>,

    /// Transform written by registration, or read when registration is skipped
    #[arg(long)]
    pub transform: Option<PathBuf>,

    /// Label map to resample
    #[arg(long)]
    pub segmentation: Option<PathBuf>,

    /// Destination of the resampled label map
    #[arg(long)]
    pub segmentation_out: Option<PathBuf>,

    /// Destination of the resampled moving volume
    #[arg(long)]
    pub output_volume: Option<PathBuf>,

    /// Registration family
    #[arg(long, value_enum, default_value_t = FamilyArg::Rigid)]
    pub family: FamilyArg,

    /// Interpolation of the volume resample
    #[arg(long, value_enum, default_value_t = InterpolationArg::Nn)]
    pub volume_interpolation: InterpolationArg,

    #[command(flatten)]
    pub run: RunFlags,
}

impl RegisterCommand {
    pub fn to_params(&self) -> RegistrationParams {
        RegistrationParams {
            moving_volume: self.moving_volume.clone(),
            fixed_volume: self.fixed_volume.clone(),
            moving_mask: self.moving_mask.clone(),
            fixed_mask: self.fixed_mask.clone(),
            transform: self.transform.clone(),
            segmentation: self.segmentation.clone(),
            segmentation_out: self.segmentation_out.clone(),
            output_volume: self.output_volume.clone(),
            family: self.family.into(),
            volume_interpolation: self.volume_interpolation.into(),
        }
    }
}

/// Combine two label maps into one
#[derive(Debug, Args, Clone)]
pub struct CombineCommand {
    /// First label map
    #[arg(long)]
    pub input_a: PathBuf,

    /// Second label map
    #[arg(long)]
    pub input_b: PathBuf,

    /// Combined label map
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub run: RunFlags,
}

impl CombineCommand {
    pub fn to_params(&self) -> CombineParams {
        CombineParams::new(&self.input_a, &self.input_b, &self.output)
    }
}

/// Show where tools resolve to
#[derive(Debug, Args, Clone)]
pub struct LocateCommand {
    /// Tool names; defaults to every configured tool
    pub tools: Vec<String>,
}

/// Registration family argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FamilyArg {
    Affine,
    #[clap(name = "scale-skew")]
    ScaleSkew,
    Rigid,
    #[clap(name = "non-growing")]
    NonGrowing,
}

impl From<FamilyArg> for RegistrationFamily {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Affine => RegistrationFamily::Affine,
            FamilyArg::ScaleSkew => RegistrationFamily::ScaleSkewVersor3D,
            FamilyArg::Rigid => RegistrationFamily::Rigid,
            FamilyArg::NonGrowing => RegistrationFamily::NonGrowingRigid,
        }
    }
}

/// Interpolation argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InterpolationArg {
    Nn,
    Linear,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Nn => Interpolation::NearestNeighbor,
            InterpolationArg::Linear => Interpolation::Linear,
        }
    }
}
