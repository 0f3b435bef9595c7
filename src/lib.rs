//! labelpipe - runs registration and label pipelines through external image tools

pub mod cli;
pub mod core;
pub mod execution;
pub mod process;

// Re-export commonly used types
pub use core::{
    FailurePolicy, PipelineResult, PipelineSpec, ProcessOutcome, ProcessState, RunnerConfig,
    StageKind, StageSpec, ToolPath,
};
pub use execution::{ExecutionEvent, PipelineBuilder, PipelineExecutor, PipelineRequest};
pub use process::{ProcessRunner, ProgressCallback, RunOptions, StageRunner, ToolLocator};
