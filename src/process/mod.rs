//! The process boundary: locating tools and running them

pub mod assembler;
pub mod locator;
pub mod progress;
pub mod runner;

pub use assembler::{Record, RecordAssembler};
pub use locator::ToolLocator;
pub use progress::{NoopCallback, ProgressCallback};
pub use runner::{ProcessRunner, RunOptions, StageRunner};
