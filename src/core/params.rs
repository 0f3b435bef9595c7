//! Caller parameters and the fixed tuning tables they select

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Registration transform family; exactly one is active per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationFamily {
    Affine,
    #[serde(rename = "scale-skew")]
    ScaleSkewVersor3D,
    #[default]
    Rigid,
    /// Single coarse rigid pass for structures that do not change shape
    #[serde(rename = "non-growing")]
    NonGrowingRigid,
}

/// Optimizer constants for one registration invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub min_step_length: f64,
    pub iterations: u32,
}

/// Constants of the rigid pass that follows an affine or scale-skew run
pub const REFINEMENT_TUNING: Tuning = Tuning {
    min_step_length: 0.000_000_1,
    iterations: 20_000,
};

impl RegistrationFamily {
    /// Flag selecting this family on the registration tool
    pub fn flag(self) -> &'static str {
        match self {
            RegistrationFamily::Affine => "--useAffine",
            RegistrationFamily::ScaleSkewVersor3D => "--useScaleSkewVersor3D",
            RegistrationFamily::Rigid | RegistrationFamily::NonGrowingRigid => "--useRigid",
        }
    }

    /// Rigid is the slow fallback: smaller steps, more iterations.
    pub fn tuning(self) -> Tuning {
        match self {
            RegistrationFamily::Affine => Tuning {
                min_step_length: 0.000_000_1,
                iterations: 10_000,
            },
            RegistrationFamily::ScaleSkewVersor3D => Tuning {
                min_step_length: 0.000_000_1,
                iterations: 20_000,
            },
            RegistrationFamily::Rigid => Tuning {
                min_step_length: 0.000_000_01,
                iterations: 40_000,
            },
            RegistrationFamily::NonGrowingRigid => Tuning {
                min_step_length: 0.000_001,
                iterations: 15_000,
            },
        }
    }

    /// Whether a rigid refinement pass is appended after this family
    pub fn needs_refinement(self) -> bool {
        matches!(self, RegistrationFamily::Affine | RegistrationFamily::ScaleSkewVersor3D)
    }
}

/// Interpolation mode of a resample stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    #[default]
    NearestNeighbor,
    Linear,
}

impl Interpolation {
    pub fn as_arg(self) -> &'static str {
        match self {
            Interpolation::NearestNeighbor => "nn",
            Interpolation::Linear => "linear",
        }
    }
}

/// Inputs of the masked registration and resampling pipeline
///
/// Empty paths are treated the same as absent ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationParams {
    pub moving_volume: PathBuf,
    pub fixed_volume: PathBuf,
    pub moving_mask: Option<PathBuf>,
    pub fixed_mask: Option<PathBuf>,
    /// Output of registration, or an existing transform when registration is skipped
    pub transform: Option<PathBuf>,
    pub segmentation: Option<PathBuf>,
    pub segmentation_out: Option<PathBuf>,
    pub output_volume: Option<PathBuf>,
    pub family: RegistrationFamily,
    pub volume_interpolation: Interpolation,
}

impl RegistrationParams {
    pub fn new(moving_volume: impl Into<PathBuf>, fixed_volume: impl Into<PathBuf>) -> Self {
        Self {
            moving_volume: moving_volume.into(),
            fixed_volume: fixed_volume.into(),
            ..Self::default()
        }
    }

    pub fn with_masks(mut self, moving: impl Into<PathBuf>, fixed: impl Into<PathBuf>) -> Self {
        self.moving_mask = Some(moving.into());
        self.fixed_mask = Some(fixed.into());
        self
    }

    pub fn with_transform(mut self, transform: impl Into<PathBuf>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn with_segmentation(mut self, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        self.segmentation = Some(input.into());
        self.segmentation_out = Some(output.into());
        self
    }

    pub fn with_output_volume(mut self, output: impl Into<PathBuf>) -> Self {
        self.output_volume = Some(output.into());
        self
    }

    pub fn with_family(mut self, family: RegistrationFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_volume_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.volume_interpolation = interpolation;
        self
    }

    /// Both masks, when both are supplied
    pub fn masks(&self) -> Option<(&Path, &Path)> {
        Some((present(&self.moving_mask)?, present(&self.fixed_mask)?))
    }

    pub fn transform(&self) -> Option<&Path> {
        present(&self.transform)
    }

    pub fn segmentation(&self) -> Option<&Path> {
        present(&self.segmentation)
    }

    pub fn segmentation_out(&self) -> Option<&Path> {
        present(&self.segmentation_out)
    }

    pub fn output_volume(&self) -> Option<&Path> {
        present(&self.output_volume)
    }
}

/// Inputs of the label combination pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombineParams {
    pub input_a: PathBuf,
    pub input_b: PathBuf,
    pub output: PathBuf,
}

impl CombineParams {
    pub fn new(
        input_a: impl Into<PathBuf>,
        input_b: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_a: input_a.into(),
            input_b: input_b.into(),
            output: output.into(),
        }
    }
}

fn present(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}
