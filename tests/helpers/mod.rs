//! Test utilities shared by the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use labelpipe::core::{ProcessOutcome, StageKind, StageSpec, ToolNames};
use labelpipe::execution::{PipelineBuilder, PipelineRequest};
use labelpipe::process::{ProgressCallback, StageRunner, ToolLocator};
use labelpipe::PipelineSpec;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Stage runner that never spawns anything.
///
/// Outcomes are scripted per stage kind (exit 0 otherwise). When a
/// resample or combine stage "succeeds" the runner writes its last
/// argument to disk, standing in for a tool that produces its output file.
#[derive(Default)]
pub struct RecordingRunner {
    outcomes: Mutex<HashMap<StageKind, ProcessOutcome>>,
    ran: Mutex<Vec<StageSpec>>,
    produce_outputs: bool,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write each successful stage's output file
    pub fn producing_outputs() -> Self {
        Self {
            produce_outputs: true,
            ..Self::default()
        }
    }

    pub fn with_outcome(self, kind: StageKind, outcome: ProcessOutcome) -> Self {
        self.outcomes.lock().unwrap().insert(kind, outcome);
        self
    }

    /// Stages in the order they were run
    pub fn ran(&self) -> Vec<StageSpec> {
        self.ran.lock().unwrap().clone()
    }

    pub fn ran_kinds(&self) -> Vec<StageKind> {
        self.ran().iter().map(|stage| stage.kind).collect()
    }
}

#[async_trait]
impl StageRunner for RecordingRunner {
    async fn run(&self, stage: &StageSpec, _progress: Option<&dyn ProgressCallback>) -> ProcessOutcome {
        self.ran.lock().unwrap().push(stage.clone());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&stage.kind)
            .cloned()
            .unwrap_or_else(|| ProcessOutcome::exited(0));

        let writes_output = !matches!(stage.kind, StageKind::Registration | StageKind::Refinement);
        if self.produce_outputs && writes_output && outcome.is_success() {
            if let Some(output) = stage.arguments.last() {
                std::fs::write(output, b"volume").unwrap();
            }
        }
        outcome
    }
}

/// Collects every callback the runner makes
#[derive(Default)]
pub struct RecordingCallback {
    pub markers: Mutex<Vec<String>>,
    pub ticks: Mutex<Vec<Duration>>,
}

impl RecordingCallback {
    pub fn markers(&self) -> Vec<String> {
        self.markers.lock().unwrap().clone()
    }

    pub fn tick_count(&self) -> usize {
        self.ticks.lock().unwrap().len()
    }
}

impl ProgressCallback for RecordingCallback {
    fn on_marker(&self, _stage: StageKind, marker: &str) {
        self.markers.lock().unwrap().push(marker.to_string());
    }

    fn on_tick(&self, _stage: StageKind, elapsed: Duration) {
        self.ticks.lock().unwrap().push(elapsed);
    }
}

/// Build a pipeline with a locator that finds nothing
pub fn build_offline(request: &PipelineRequest) -> PipelineSpec {
    let mut locator = ToolLocator::with_dirs(vec![]);
    PipelineBuilder::new(&mut locator, ToolNames::default())
        .build(request)
        .unwrap()
}

/// Build a pipeline resolving tools from `dir`
pub fn build_with_tools(request: &PipelineRequest, dir: &Path) -> PipelineSpec {
    let mut locator = ToolLocator::with_dirs(vec![dir.to_path_buf()]);
    PipelineBuilder::new(&mut locator, ToolNames::default())
        .build(request)
        .unwrap()
}

/// Create an executable shell script named `name` in `dir`
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Install stand-ins for every configured tool that write their last argument
#[cfg(unix)]
pub fn install_fake_tools(dir: &Path) {
    let names = ToolNames::default();
    let body = r#"for last; do :; done
echo "DRegistering"
echo "processing $last"
printf 'volume' > "$last""#;
    for name in [&names.registration, &names.resample, &names.label_combine] {
        write_script(dir, name, body);
    }
}

pub fn assert_kinds(spec: &PipelineSpec, expected: &[StageKind]) {
    assert_eq!(spec.kinds(), expected, "unexpected stage list");
}
