//! Pipeline construction, execution and verification

pub mod builder;
pub mod executor;
pub mod verifier;

pub use builder::{BuildError, PipelineBuilder, PipelineRequest};
pub use executor::{EventHandler, ExecutionEvent, PipelineExecutor};
pub use verifier::{verify_pipeline, FileVerifier, ResultVerifier, VerifyError};
