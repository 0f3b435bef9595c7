//! Final artifact check
//!
//! After a pipeline runs, the file it was supposed to produce is opened to
//! confirm it exists and is readable. This is the one check whose failure
//! always makes the whole run fail.

use crate::core::PipelineSpec;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("pipeline has no output artifact to verify")]
    NoArtifact,

    #[error("output {0} was not produced")]
    Missing(PathBuf),

    #[error("output {0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("output {0} is empty")]
    Empty(PathBuf),

    #[error("output {path} cannot be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Confirms that a produced file is loadable
pub trait ResultVerifier: Send + Sync {
    fn verify(&self, artifact: &Path) -> Result<(), VerifyError>;
}

/// Checks the artifact exists, is a non-empty regular file, and can be read
#[derive(Debug, Clone, Default)]
pub struct FileVerifier;

impl ResultVerifier for FileVerifier {
    fn verify(&self, artifact: &Path) -> Result<(), VerifyError> {
        let metadata = match std::fs::metadata(artifact) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VerifyError::Missing(artifact.to_path_buf()))
            }
            Err(source) => {
                return Err(VerifyError::Unreadable {
                    path: artifact.to_path_buf(),
                    source,
                })
            }
        };
        if !metadata.is_file() {
            return Err(VerifyError::NotAFile(artifact.to_path_buf()));
        }
        if metadata.len() == 0 {
            return Err(VerifyError::Empty(artifact.to_path_buf()));
        }

        let mut byte = [0u8; 1];
        File::open(artifact)
            .and_then(|mut file| file.read_exact(&mut byte))
            .map_err(|source| VerifyError::Unreadable {
                path: artifact.to_path_buf(),
                source,
            })
    }
}

/// Verify the nominal artifact of `spec`, returning its path
pub fn verify_pipeline<'s>(
    verifier: &dyn ResultVerifier,
    spec: &'s PipelineSpec,
) -> Result<&'s Path, VerifyError> {
    let artifact = spec.artifact().ok_or(VerifyError::NoArtifact)?;
    verifier.verify(artifact)?;
    Ok(artifact)
}
