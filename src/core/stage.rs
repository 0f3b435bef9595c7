//! Stage domain model

use crate::core::tool::ToolPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a stage does within a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// Masked registration producing the output transform
    Registration,
    /// Rigid pass seeded with the registration transform
    Refinement,
    /// Nearest-neighbor resample of the segmentation
    LabelResample,
    /// Resample of the moving volume
    VolumeResample,
    /// Combination of two label maps
    LabelCombine,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Registration => "registration",
            StageKind::Refinement => "refinement",
            StageKind::LabelResample => "label-resample",
            StageKind::VolumeResample => "volume-resample",
            StageKind::LabelCombine => "label-combine",
        };
        f.write_str(name)
    }
}

/// A single external invocation: the tool plus its ordered arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSpec {
    /// Role of this stage in the pipeline
    pub kind: StageKind,

    /// The executable to run
    pub command: ToolPath,

    /// Flags and values, excluding the executable itself
    pub arguments: Vec<String>,
}

impl StageSpec {
    pub fn new(kind: StageKind, command: ToolPath) -> Self {
        Self {
            kind,
            command,
            arguments: Vec::new(),
        }
    }

    /// Append a single token
    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.arguments.push(token.into());
        self
    }

    /// Append a flag followed by its value
    pub fn flag(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Full argument vector; the first token is always the tool path
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.arguments.len() + 1);
        argv.push(self.command.to_string());
        argv.extend(self.arguments.iter().cloned());
        argv
    }

    /// Whether `flag` appears as a token
    pub fn has_flag(&self, flag: &str) -> bool {
        self.arguments.iter().any(|a| a == flag)
    }

    /// The token following `flag`, if any
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.arguments
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.arguments.get(i + 1))
            .map(String::as_str)
    }

    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }
}
