//! External process runner
//!
//! Spawns one stage's command, waits on it in bounded poll windows, and
//! classifies how it ended. A child's own failure (nonzero exit, crash) is
//! reported as a [`ProcessOutcome`], never as an error.

use crate::core::{ProcessOutcome, RunnerConfig, StageSpec};
use crate::process::assembler::{Record, RecordAssembler};
use crate::process::ProgressCallback;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Shortest poll window; a zero period would spin
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Runs a single stage and reports its outcome
///
/// This is the seam the pipeline executor drives; tests substitute a mock.
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run(&self, stage: &StageSpec, progress: Option<&dyn ProgressCallback>)
        -> ProcessOutcome;
}

/// Settings that are fixed for the duration of one `run` call
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Longest single wait for output or exit before the runner re-checks
    pub poll_interval: Duration,

    /// Report elapsed time on each poll tick
    pub emit_progress: bool,

    /// Kill the child once it has run this long
    pub deadline: Option<Duration>,

    /// Leading character of progress-marker records
    pub sentinel: char,

    /// Output lines kept for diagnostics
    pub tail_lines: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            emit_progress: false,
            deadline: None,
            sentinel: 'D',
            tail_lines: 20,
        }
    }
}

impl RunOptions {
    /// Intervals below one millisecond are raised to it
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_progress(mut self, emit_progress: bool) -> Self {
        self.emit_progress = emit_progress;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_sentinel(mut self, sentinel: char) -> Self {
        self.sentinel = sentinel;
        self
    }
}

impl From<&RunnerConfig> for RunOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            emit_progress: config.emit_progress,
            deadline: config.deadline(),
            sentinel: config.sentinel(),
            ..Self::default()
        }
    }
}

/// Where the wait protocol stands for one child
#[derive(Debug)]
enum Phase {
    /// Launched, nothing observed yet
    Spawned,
    /// Output or a poll tick has been seen; exit not yet observed
    Running,
    /// The OS reported exit
    Exited(ExitStatus),
    /// Killed after the deadline passed
    Expired(Duration),
    /// Waiting on the child failed
    WaitFailed(io::Error),
}

impl Phase {
    fn is_terminal(&self) -> bool {
        !matches!(self, Phase::Spawned | Phase::Running)
    }

    /// The first read or tick moves a fresh child to `Running`
    fn observed(self) -> Self {
        match self {
            Phase::Spawned => Phase::Running,
            other => other,
        }
    }
}

/// Spawns stage commands as hidden, piped child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    options: RunOptions,
}

impl ProcessRunner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Run `stage` to completion.
    ///
    /// Never returns an error: launch failures become `SpawnError`,
    /// abnormal termination becomes `RuntimeException`, and a wait loop
    /// that ends in a non-terminal phase becomes `Unexpected`.
    pub async fn run(
        &self,
        stage: &StageSpec,
        progress: Option<&dyn ProgressCallback>,
    ) -> ProcessOutcome {
        let started_at = Utc::now();
        let clock = Instant::now();
        let outcome = self.run_inner(stage, progress, clock).await;
        outcome.with_timing(started_at, clock.elapsed())
    }

    async fn run_inner(
        &self,
        stage: &StageSpec,
        progress: Option<&dyn ProgressCallback>,
        clock: Instant,
    ) -> ProcessOutcome {
        let Some(path) = stage.command.path() else {
            warn!("Refusing to run {} stage: {} was not found", stage.kind, stage.command.name());
            return ProcessOutcome::spawn_error(format!(
                "{} was not found in any search path",
                stage.command.name()
            ));
        };

        let mut command = Command::new(path);
        command
            .args(&stage.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        debug!("Spawning {}: {}", stage.kind, stage.command_line());
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Could not run {}: {}", path.display(), e);
                return ProcessOutcome::spawn_error(format!(
                    "could not run {}: {}",
                    path.display(),
                    e
                ));
            }
        };

        let mut capture = OutputCapture::new(&self.options, stage, progress);
        let phase = self.wait(stage, &mut child, &mut capture, progress, clock).await;
        let tail = capture.finish();

        let outcome = classify(phase, stage);
        if outcome.is_success() {
            outcome
        } else {
            outcome.with_output_tail(tail)
        }
    }

    /// Drain both pipes, then wait for exit, ticking every poll interval.
    ///
    /// A child can exit while a descendant still holds its pipes open, so
    /// every tick during the drain also checks whether it has exited.
    async fn wait(
        &self,
        stage: &StageSpec,
        child: &mut Child,
        capture: &mut OutputCapture<'_>,
        progress: Option<&dyn ProgressCallback>,
        clock: Instant,
    ) -> Phase {
        let mut phase = Phase::Spawned;
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut out_buf = vec![0u8; 4096];
        let mut err_buf = vec![0u8; 4096];

        let poll_interval = self.options.poll_interval.max(MIN_POLL_INTERVAL);
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        while !phase.is_terminal() && (stdout.is_some() || stderr.is_some()) {
            tokio::select! {
                read = read_chunk(&mut stdout, &mut out_buf) => {
                    phase = phase.observed();
                    match read {
                        Ok(0) | Err(_) => {
                            capture.close(Pipe::Stdout);
                            stdout = None;
                        }
                        Ok(n) => capture.feed(Pipe::Stdout, &out_buf[..n]),
                    }
                },
                read = read_chunk(&mut stderr, &mut err_buf) => {
                    phase = phase.observed();
                    match read {
                        Ok(0) | Err(_) => {
                            capture.close(Pipe::Stderr);
                            stderr = None;
                        }
                        Ok(n) => capture.feed(Pipe::Stderr, &err_buf[..n]),
                    }
                },
                _ = ticker.tick() => {
                    phase = phase.observed();
                    if let Some(next) = self.check_exit(stage, child, progress, clock).await {
                        phase = next;
                    }
                }
            }
        }

        if let Phase::Exited(_) = phase {
            // Exited with pipes still open: take what is already buffered
            drain_buffered(&mut stdout, &mut out_buf, poll_interval, |bytes| {
                capture.feed(Pipe::Stdout, bytes)
            })
            .await;
            drain_buffered(&mut stderr, &mut err_buf, poll_interval, |bytes| {
                capture.feed(Pipe::Stderr, bytes)
            })
            .await;
        }

        if !phase.is_terminal() {
            phase = loop {
                tokio::select! {
                    status = child.wait() => break match status {
                        Ok(status) => Phase::Exited(status),
                        Err(e) => Phase::WaitFailed(e),
                    },
                    _ = ticker.tick() => {
                        if let Some(limit) = self.tick(stage, progress, clock) {
                            break expire(child, limit).await;
                        }
                    }
                }
            };
        }

        phase
    }

    /// Tick while draining: an observed exit wins over the deadline.
    async fn check_exit(
        &self,
        stage: &StageSpec,
        child: &mut Child,
        progress: Option<&dyn ProgressCallback>,
        clock: Instant,
    ) -> Option<Phase> {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("{} exited with its output still open", stage.command.name());
                return Some(Phase::Exited(status));
            }
            Ok(None) => {}
            Err(e) => return Some(Phase::WaitFailed(e)),
        }
        match self.tick(stage, progress, clock) {
            Some(limit) => Some(expire(child, limit).await),
            None => None,
        }
    }

    /// Report elapsed time; returns the deadline if it has passed.
    fn tick(
        &self,
        stage: &StageSpec,
        progress: Option<&dyn ProgressCallback>,
        clock: Instant,
    ) -> Option<Duration> {
        let elapsed = clock.elapsed();
        if self.options.emit_progress {
            trace!("{} (processing since {} seconds)", stage.kind, elapsed.as_secs());
            if let Some(callback) = progress {
                callback.on_tick(stage.kind, elapsed);
            }
        }
        self.options.deadline.filter(|limit| elapsed >= *limit)
    }
}

#[async_trait]
impl StageRunner for ProcessRunner {
    async fn run(
        &self,
        stage: &StageSpec,
        progress: Option<&dyn ProgressCallback>,
    ) -> ProcessOutcome {
        ProcessRunner::run(self, stage, progress).await
    }
}

async fn read_chunk<R: AsyncRead + Unpin>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match pipe {
        Some(pipe) => pipe.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Read whatever arrives within one poll window, then stop reading the pipe
async fn drain_buffered<R, F>(pipe: &mut Option<R>, buf: &mut [u8], window: Duration, mut feed: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let started = Instant::now();
    while pipe.is_some() {
        let remaining = window.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            break;
        }
        match timeout(remaining, read_chunk(pipe, buf)).await {
            Ok(Ok(n)) if n > 0 => feed(&buf[..n]),
            _ => *pipe = None,
        }
    }
}

async fn expire(child: &mut Child, limit: Duration) -> Phase {
    warn!("Child exceeded deadline of {:?}, killing it", limit);
    if let Err(e) = child.kill().await {
        warn!("Failed to kill child: {}", e);
    }
    Phase::Expired(limit)
}

fn classify(phase: Phase, stage: &StageSpec) -> ProcessOutcome {
    match phase {
        Phase::Exited(status) => classify_status(status, stage),
        Phase::Expired(limit) => ProcessOutcome::timed_out(format!(
            "{} was killed after exceeding the {:?} deadline",
            stage.command.name(),
            limit
        )),
        Phase::WaitFailed(e) => {
            error!("Lost track of {} while waiting: {}", stage.command.name(), e);
            ProcessOutcome::unexpected(format!("failed to wait for {}: {}", stage.command.name(), e))
        }
        phase @ (Phase::Spawned | Phase::Running) => {
            error!(
                "Unexpected ending state after running {}: {:?} (internal consistency violation)",
                stage.command.name(),
                phase
            );
            ProcessOutcome::unexpected(format!(
                "unexpected ending state after running {}: {:?}",
                stage.command.name(),
                phase
            ))
        }
    }
}

fn classify_status(status: ExitStatus, stage: &StageSpec) -> ProcessOutcome {
    if let Some(code) = status.code() {
        if is_exception_code(code) {
            let message = format!(
                "{} terminated with an exception: 0x{:08X}",
                stage.command.name(),
                code as u32
            );
            error!("{}", message);
            return ProcessOutcome::runtime_exception(message);
        }
        if code == 0 {
            info!("{} finished", stage.kind);
        } else {
            warn!("{} exited with code {}", stage.command.name(), code);
        }
        return ProcessOutcome::exited(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            let core = if status.core_dumped() { " (core dumped)" } else { "" };
            let message = format!(
                "{} terminated with an exception: signal {}{}",
                stage.command.name(),
                signal,
                core
            );
            error!("{}", message);
            return ProcessOutcome::runtime_exception(message);
        }
    }

    ProcessOutcome::unexpected(format!(
        "{} ended with neither an exit code nor a signal",
        stage.command.name()
    ))
}

/// NTSTATUS error codes (access violation and friends) surface as exit codes on Windows.
fn is_exception_code(code: i32) -> bool {
    cfg!(windows) && (code as u32) >= 0xC000_0000
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Per-run output buffers: one assembler per pipe plus a bounded tail
struct OutputCapture<'a> {
    stdout: RecordAssembler,
    stderr: RecordAssembler,
    tail: VecDeque<String>,
    tail_lines: usize,
    stage: &'a StageSpec,
    progress: Option<&'a dyn ProgressCallback>,
}

impl<'a> OutputCapture<'a> {
    fn new(
        options: &RunOptions,
        stage: &'a StageSpec,
        progress: Option<&'a dyn ProgressCallback>,
    ) -> Self {
        Self {
            stdout: RecordAssembler::new(options.sentinel),
            stderr: RecordAssembler::new(options.sentinel),
            tail: VecDeque::with_capacity(options.tail_lines),
            tail_lines: options.tail_lines,
            stage,
            progress,
        }
    }

    fn feed(&mut self, pipe: Pipe, bytes: &[u8]) {
        let records = self.assembler(pipe).push(bytes);
        for record in records {
            self.handle(record);
        }
    }

    fn close(&mut self, pipe: Pipe) {
        if let Some(record) = self.assembler(pipe).finish() {
            self.handle(record);
        }
    }

    fn assembler(&mut self, pipe: Pipe) -> &mut RecordAssembler {
        match pipe {
            Pipe::Stdout => &mut self.stdout,
            Pipe::Stderr => &mut self.stderr,
        }
    }

    fn handle(&mut self, record: Record) {
        match record {
            Record::Marker(marker) => {
                trace!("{} marker: {}", self.stage.kind, marker);
                if let Some(callback) = self.progress {
                    callback.on_marker(self.stage.kind, &marker);
                }
            }
            Record::Line(line) => {
                trace!("{}: {}", self.stage.kind, line);
                if self.tail_lines == 0 {
                    return;
                }
                if self.tail.len() == self.tail_lines {
                    self.tail.pop_front();
                }
                self.tail.push_back(line);
            }
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.close(Pipe::Stdout);
        self.close(Pipe::Stderr);
        self.tail.into_iter().collect()
    }
}
