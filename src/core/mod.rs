//! Core domain models
//!
//! This module defines the data that describes a run: the tools it needs,
//! the stages it is made of, the parameters callers supply, and the
//! outcomes that come back from the process boundary.

pub mod config;
pub mod params;
pub mod pipeline;
pub mod stage;
pub mod state;
pub mod tool;

pub use config::{FailurePolicy, RunnerConfig, ToolNames};
pub use params::*;
pub use pipeline::*;
pub use stage::*;
pub use state::*;
pub use tool::*;
