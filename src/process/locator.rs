//! Executable lookup over PATH and extra directories

use crate::core::{RunnerConfig, ToolPath};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{info, warn};

/// Resolves tool names to executables, once per name.
///
/// Directories are searched in order; the first directory holding a
/// matching executable wins. The system PATH comes first, then the
/// extra directories.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    /// Value of PATH captured at construction, if the system path is searched
    system_path: Option<OsString>,

    /// Searched after the system path
    extra_dirs: Vec<PathBuf>,

    cache: HashMap<String, ToolPath>,
}

impl ToolLocator {
    /// Search the system PATH, then `extra_dirs`
    pub fn new(extra_dirs: Vec<PathBuf>) -> Self {
        Self {
            system_path: std::env::var_os("PATH"),
            extra_dirs,
            cache: HashMap::new(),
        }
    }

    /// Search only `dirs`, ignoring PATH
    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            system_path: None,
            extra_dirs: dirs,
            cache: HashMap::new(),
        }
    }

    /// Locator for the configured search dirs plus the host application's
    /// tool directory on platforms that use it.
    pub fn from_config(config: &RunnerConfig) -> Self {
        let mut extra_dirs = config.search_dirs.clone();
        if config.host_dir_enabled() {
            if let Some(root) = std::env::var_os(&config.host_env_var) {
                let dir = PathBuf::from(root).join(&config.host_subpath);
                info!("Additional tool path: {}", dir.display());
                extra_dirs.push(dir);
            }
        }
        Self::new(extra_dirs)
    }

    /// All directories in search order
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .system_path
            .as_ref()
            .map(|path| std::env::split_paths(path).collect())
            .unwrap_or_default();
        dirs.extend(self.extra_dirs.iter().cloned());
        dirs
    }

    /// Resolve `name`, returning an unresolved `ToolPath` when it is not found.
    ///
    /// The first lookup of a name is cached for the life of the locator.
    pub fn resolve(&mut self, name: &str) -> ToolPath {
        if let Some(tool) = self.cache.get(name) {
            return tool.clone();
        }

        let tool = self.lookup(name);
        match tool.path() {
            Some(path) => info!("Path to {} executable: {}", name, path.display()),
            None => warn!("{} was not found in any search path", name),
        }
        self.cache.insert(name.to_string(), tool.clone());
        tool
    }

    fn lookup(&self, name: &str) -> ToolPath {
        let dirs = self.search_dirs();
        if dirs.is_empty() {
            return ToolPath::unresolved(name);
        }

        let joined = match std::env::join_paths(&dirs) {
            Ok(joined) => joined,
            Err(e) => {
                warn!("Cannot build search path for {}: {}", name, e);
                return ToolPath::unresolved(name);
            }
        };
        let cwd = std::env::current_dir().unwrap_or_default();

        match which::which_in(name, Some(joined), cwd) {
            Ok(path) => ToolPath::resolved(name, path),
            Err(_) => ToolPath::unresolved(name),
        }
    }
}
