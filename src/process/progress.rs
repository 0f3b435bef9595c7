//! Progress reporting from a running stage
//!
//! The runner calls back into a [`ProgressCallback`] while it waits on a
//! child: once per progress marker the child prints, and once per poll tick
//! when elapsed-time reporting is enabled. Callbacks observe only; they
//! cannot change the poll interval or stop the child.
//!
//! # Example
//!
//! ```
//! use labelpipe::core::StageKind;
//! use labelpipe::process::ProgressCallback;
//! use std::time::Duration;
//!
//! struct Printer;
//!
//! impl ProgressCallback for Printer {
//!     fn on_tick(&self, stage: StageKind, elapsed: Duration) {
//!         eprint!("{} (processing since {} seconds)\r", stage, elapsed.as_secs());
//!     }
//! }
//! ```

use crate::core::StageKind;
use std::time::Duration;

/// Receives progress from the process runner
///
/// This trait is object-safe and can be used as `&dyn ProgressCallback`.
pub trait ProgressCallback: Send + Sync {
    /// Called for each output record that starts with the sentinel
    fn on_marker(&self, _stage: StageKind, _marker: &str) {}

    /// Called on every poll tick when progress reporting is enabled
    fn on_tick(&self, _stage: StageKind, _elapsed: Duration) {}
}

/// Callback that ignores everything
#[derive(Debug, Clone, Default)]
pub struct NoopCallback;

impl ProgressCallback for NoopCallback {}
