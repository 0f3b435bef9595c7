//! Resolved executable locations

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A named external executable and, once located, its absolute path.
///
/// An unresolved `ToolPath` is still a valid value: the locator returns one
/// when the tool is not on any search path, and the runner refuses to spawn it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolPath {
    name: String,
    path: Option<PathBuf>,
}

impl ToolPath {
    /// A tool that was found at `path`
    pub fn resolved(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
        }
    }

    /// A tool that could not be found
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    /// The name the tool was looked up by
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.path.is_some()
    }
}

impl fmt::Display for ToolPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}", path.display()),
            None => write!(f, "<unresolved {}>", self.name),
        }
    }
}
