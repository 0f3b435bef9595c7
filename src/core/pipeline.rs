//! Pipeline domain model

use crate::core::{
    stage::{StageKind, StageSpec},
    tool::ToolPath,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// An ordered, immutable sequence of stages built for one run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSpec {
    /// Pipeline name
    name: String,

    /// Stages in execution order
    stages: Vec<StageSpec>,

    /// File the run is expected to produce
    artifact: Option<PathBuf>,
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>, stages: Vec<StageSpec>, artifact: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            stages,
            artifact,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Kinds of all stages, in order
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind).collect()
    }

    /// First stage of the given kind
    pub fn stage(&self, kind: StageKind) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// The nominal output the verifier should open
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Tools referenced by some stage that were never located
    pub fn unresolved_tools(&self) -> Vec<&ToolPath> {
        let mut tools: Vec<&ToolPath> = Vec::new();
        for stage in &self.stages {
            if !stage.command.is_resolved() && !tools.contains(&&stage.command) {
                tools.push(&stage.command);
            }
        }
        tools
    }
}
