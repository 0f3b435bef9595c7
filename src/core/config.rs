//! Runner configuration from YAML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the executor does after a stage fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Run every remaining stage regardless of earlier failures
    #[default]
    BestEffort,
    /// Stop at the first stage that does not exit with code zero
    FailFast,
}

/// Names of the external tools each stage kind invokes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolNames {
    pub registration: String,
    pub resample: String,
    pub label_combine: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            registration: "BRAINSFit".to_string(),
            resample: "ResampleScalarVectorDWIVolume".to_string(),
            label_combine: "ImageLabelCombine".to_string(),
        }
    }
}

/// Top-level runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// How long each poll waits for child output or exit
    pub poll_interval_ms: u64,

    /// Overall per-stage deadline; absent means wait indefinitely
    pub deadline_secs: Option<u64>,

    pub failure_policy: FailurePolicy,

    /// Leading character of progress-marker records
    pub progress_sentinel: String,

    /// Report elapsed time on every poll tick
    pub emit_progress: bool,

    /// Extra directories searched after PATH
    pub search_dirs: Vec<PathBuf>,

    /// Environment variable naming the host application's root
    pub host_env_var: String,

    /// Tool directory relative to the host root
    pub host_subpath: PathBuf,

    /// Operating systems (as in `std::env::consts::OS`) that search the host directory
    pub host_dir_platforms: Vec<String>,

    pub tools: ToolNames,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            deadline_secs: None,
            failure_policy: FailurePolicy::BestEffort,
            progress_sentinel: "D".to_string(),
            emit_progress: false,
            search_dirs: Vec::new(),
            host_env_var: "SLICER_HOME".to_string(),
            host_subpath: PathBuf::from("lib/Slicer-4.13/cli-modules"),
            host_dir_platforms: vec!["macos".to_string()],
            tools: ToolNames::default(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RunnerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `explicit` if given, else the default location if it exists, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/labelpipe/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("labelpipe").join("config.yaml"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if self.deadline_secs == Some(0) {
            anyhow::bail!("deadline_secs must be greater than zero when set");
        }
        if self.progress_sentinel.chars().count() != 1 {
            anyhow::bail!(
                "progress_sentinel must be a single character, got '{}'",
                self.progress_sentinel
            );
        }
        for (key, name) in [
            ("registration", &self.tools.registration),
            ("resample", &self.tools.resample),
            ("label_combine", &self.tools.label_combine),
        ] {
            if name.trim().is_empty() {
                anyhow::bail!("tools.{} must not be empty", key);
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn sentinel(&self) -> char {
        self.progress_sentinel.chars().next().unwrap_or('D')
    }

    /// Whether the host directory is searched on the running OS
    pub fn host_dir_enabled(&self) -> bool {
        self.host_dir_platforms
            .iter()
            .any(|os| os == std::env::consts::OS)
    }
}
