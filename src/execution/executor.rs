//! Pipeline executor - runs stages one after another

use crate::{
    core::{FailurePolicy, PipelineResult, PipelineSpec, ProcessOutcome, ProcessState, StageKind, StageOutcome},
    process::{ProgressCallback, StageRunner},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_stages: usize,
    },
    StageStarted {
        index: usize,
        stage: StageKind,
        command_line: String,
    },
    StageFinished {
        index: usize,
        stage: StageKind,
        outcome: ProcessOutcome,
    },
    StageSkipped {
        stage: StageKind,
    },
    PipelineCompleted {
        execution_id: Uuid,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Runs a built pipeline strictly in order, one stage at a time.
///
/// Under [`FailurePolicy::BestEffort`] (the default) a failed stage does not
/// stop later ones; overall failure is only visible in the result and in
/// the final artifact check.
pub struct PipelineExecutor<R> {
    runner: R,
    policy: FailurePolicy,
    progress: Option<Arc<dyn ProgressCallback>>,
    event_handlers: Vec<EventHandler>,
}

impl<R: StageRunner> PipelineExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            policy: FailurePolicy::default(),
            progress: None,
            event_handlers: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Forward stage progress to `callback`
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Execute every stage of `spec`
    pub async fn execute(&self, spec: &PipelineSpec) -> PipelineResult {
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(
            "Starting pipeline {} ({} stages, {:?})",
            spec.name(),
            spec.len(),
            self.policy
        );
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: spec.name().to_string(),
            total_stages: spec.len(),
        });

        let mut outcomes = Vec::with_capacity(spec.len());
        let mut skipped = Vec::new();
        let mut halted = false;

        for (index, stage) in spec.stages().iter().enumerate() {
            if halted {
                self.emit_event(ExecutionEvent::StageSkipped { stage: stage.kind });
                skipped.push(stage.kind);
                continue;
            }

            self.emit_event(ExecutionEvent::StageStarted {
                index,
                stage: stage.kind,
                command_line: stage.command_line(),
            });

            let outcome = self.runner.run(stage, self.progress.as_deref()).await;
            self.log_outcome(stage.kind, &outcome);

            if !outcome.is_success() && self.policy == FailurePolicy::FailFast {
                warn!("Halting pipeline after {} failed", stage.kind);
                halted = true;
            }

            self.emit_event(ExecutionEvent::StageFinished {
                index,
                stage: stage.kind,
                outcome: outcome.clone(),
            });
            outcomes.push(StageOutcome {
                stage: stage.kind,
                outcome,
            });
        }

        let success = skipped.is_empty() && outcomes.iter().all(|o| o.outcome.is_success());
        info!(
            "Pipeline {} finished: {}",
            spec.name(),
            if success { "all stages succeeded" } else { "some stages failed" }
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            success,
        });

        PipelineResult {
            execution_id,
            pipeline_name: spec.name().to_string(),
            outcomes,
            skipped,
            started_at,
            completed_at: Utc::now(),
            success,
        }
    }

    fn log_outcome(&self, stage: StageKind, outcome: &ProcessOutcome) {
        match outcome.state {
            ProcessState::Exited if outcome.is_success() => {
                info!("Stage {} completed in {:.1}s", stage, outcome.elapsed.as_secs_f64());
            }
            ProcessState::Unexpected => {
                error!(
                    "Stage {} ended in an unexpected state, the wait protocol is inconsistent: {}",
                    stage,
                    outcome.summary()
                );
            }
            _ => {
                warn!("Stage {} failed: {}", stage, outcome.summary());
                for line in &outcome.output_tail {
                    warn!("  {}", line);
                }
            }
        }
    }
}
