//! Process and pipeline outcome models

use crate::core::stage::StageKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Terminal state of one external process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Child ran to completion; the exit code says whether it succeeded
    Exited,
    /// Child could not be launched
    SpawnError,
    /// Child terminated abnormally (signal, fault)
    RuntimeException,
    /// The wait loop ended in a state it should never see
    Unexpected,
    /// Child outlived the configured deadline and was killed
    TimedOut,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Exited => "exited",
            ProcessState::SpawnError => "spawn error",
            ProcessState::RuntimeException => "runtime exception",
            ProcessState::Unexpected => "unexpected state",
            ProcessState::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}

/// Classified result of running one stage; produced exactly once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub state: ProcessState,

    /// Present only for `Exited`
    pub exit_code: Option<i32>,

    pub error_message: Option<String>,

    /// Last non-marker output lines, kept for diagnostics
    #[serde(default)]
    pub output_tail: Vec<String>,

    pub started_at: DateTime<Utc>,

    pub elapsed: Duration,
}

impl ProcessOutcome {
    fn new(state: ProcessState, exit_code: Option<i32>, error_message: Option<String>) -> Self {
        Self {
            state,
            exit_code,
            error_message,
            output_tail: Vec::new(),
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn exited(code: i32) -> Self {
        Self::new(ProcessState::Exited, Some(code), None)
    }

    pub fn spawn_error(message: impl Into<String>) -> Self {
        Self::new(ProcessState::SpawnError, None, Some(message.into()))
    }

    pub fn runtime_exception(message: impl Into<String>) -> Self {
        Self::new(ProcessState::RuntimeException, None, Some(message.into()))
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ProcessState::Unexpected, None, Some(message.into()))
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(ProcessState::TimedOut, None, Some(message.into()))
    }

    pub fn with_timing(mut self, started_at: DateTime<Utc>, elapsed: Duration) -> Self {
        self.started_at = started_at;
        self.elapsed = elapsed;
        self
    }

    pub fn with_output_tail(mut self, tail: Vec<String>) -> Self {
        self.output_tail = tail;
        self
    }

    /// Exited with code zero. A nonzero code is the child's own failure.
    pub fn is_success(&self) -> bool {
        self.state == ProcessState::Exited && self.exit_code == Some(0)
    }

    /// One-line description for logs and console output
    pub fn summary(&self) -> String {
        match (self.state, self.exit_code, &self.error_message) {
            (ProcessState::Exited, Some(code), _) => format!("exited with code {}", code),
            (state, _, Some(message)) => format!("{}: {}", state, message),
            (state, _, None) => state.to_string(),
        }
    }
}

/// Outcome of one executed stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub outcome: ProcessOutcome,
}

/// Result of executing a whole pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique execution ID
    pub execution_id: Uuid,

    pub pipeline_name: String,

    /// One entry per executed stage, in execution order
    pub outcomes: Vec<StageOutcome>,

    /// Stages built but never run because fail-fast halted the pipeline
    pub skipped: Vec<StageKind>,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,

    /// Every executed stage exited with code zero and none were skipped
    pub success: bool,
}

impl PipelineResult {
    /// Outcomes without their stage labels
    pub fn process_outcomes(&self) -> Vec<&ProcessOutcome> {
        self.outcomes.iter().map(|o| &o.outcome).collect()
    }

    /// Executed stages that did not succeed
    pub fn failures(&self) -> Vec<&StageOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success()).collect()
    }

    pub fn duration(&self) -> Duration {
        self.completed_at
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}
