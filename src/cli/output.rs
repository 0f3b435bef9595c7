//! CLI output formatting

use crate::{
    core::{PipelineSpec, ProcessOutcome, ProcessState, StageKind},
    execution::ExecutionEvent,
    process::ProgressCallback,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Spinner showing how long the current stage has been running
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self { bar }
    }

    /// Print a line without tearing the spinner
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| println!("{}", line));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_marker(&self, stage: StageKind, marker: &str) {
        self.bar.set_message(format!("{} {}", style(stage).cyan(), style(marker).dim()));
    }

    fn on_tick(&self, stage: StageKind, elapsed: Duration) {
        self.bar.set_message(format!(
            "{} (processing since {} seconds)",
            style(stage).cyan(),
            elapsed.as_secs()
        ));
        self.bar.tick();
    }
}

/// Format a process state for display
pub fn format_state(state: ProcessState) -> String {
    match state {
        ProcessState::Exited => style("EXITED").green().to_string(),
        ProcessState::SpawnError => style("SPAWN ERROR").red().to_string(),
        ProcessState::RuntimeException => style("EXCEPTION").red().to_string(),
        ProcessState::Unexpected => style("UNEXPECTED").magenta().to_string(),
        ProcessState::TimedOut => style("TIMED OUT").yellow().to_string(),
    }
}

/// Format a stage outcome for display
pub fn format_outcome(outcome: &ProcessOutcome) -> String {
    if outcome.is_success() {
        format!(
            "{} {}",
            style("done").green(),
            style(format_duration(outcome.elapsed)).dim()
        )
    } else if outcome.state == ProcessState::Exited {
        format!(
            "{} {}",
            style(outcome.summary()).red(),
            style(format_duration(outcome.elapsed)).dim()
        )
    } else {
        format!(
            "{} {}",
            format_state(outcome.state),
            style(outcome.error_message.as_deref().unwrap_or_default()).dim()
        )
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_stages,
        } => format!(
            "{} Starting pipeline {} with {} stage(s) ({})",
            ROCKET,
            style(pipeline_name).bold(),
            total_stages,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StageStarted { index, stage, .. } => {
            format!("{} [{}] {}", SPINNER, index + 1, style(stage).cyan())
        }
        ExecutionEvent::StageFinished {
            index,
            stage,
            outcome,
        } => {
            let icon = if outcome.is_success() { CHECK } else { CROSS };
            format!(
                "{} [{}] {}: {}",
                icon,
                index + 1,
                style(stage).bold(),
                format_outcome(outcome)
            )
        }
        ExecutionEvent::StageSkipped { stage } => {
            format!("{} {} skipped", WARN, style(stage).dim())
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            success,
        } => {
            let status_str = if *success {
                format!("{} completed", style("successfully").green())
            } else {
                style("finished with failures").red().to_string()
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Human-readable plan of a built pipeline
pub fn format_plan(spec: &PipelineSpec) -> String {
    let mut lines = vec![format!(
        "{} Pipeline {} ({} stage(s))",
        INFO,
        style(spec.name()).bold(),
        spec.len()
    )];
    for (index, stage) in spec.stages().iter().enumerate() {
        lines.push(format!("  {}. {}", index + 1, style(stage.kind).cyan()));
        lines.push(format!("     {}", style(stage.command_line()).dim()));
    }
    if let Some(artifact) = spec.artifact() {
        lines.push(format!("  Output: {}", artifact.display()));
    }
    lines.join("\n")
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
