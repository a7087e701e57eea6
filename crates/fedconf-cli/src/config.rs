//! # Configuration
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. `fedconf.yaml` (the `--config` path, or `./fedconf.yaml` if present)
//! 2. environment variables
//! 3. command-line flags (applied by each subcommand)
//!
//! Variables:
//! - `FEDCONF_REGISTRY`: registry export path
//! - `FEDCONF_OUTPUT_DIR`: publication root
//! - `FEDCONF_HELD_BACK_VERSIONS`: comma-separated versions, e.g. `2` or `v2,v3`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use fedconf_core::ConfigurationVersion;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fedconf.yaml";

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`Settings`].
    #[error("failed to parse config {path}: {reason}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// An environment variable holds an unusable value.
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

fn default_parallel() -> bool {
    true
}

/// Effective settings for a CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Registry export (YAML or JSON).
    #[serde(default)]
    pub registry: Option<PathBuf>,
    /// Publication root.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Versions excluded from becoming current.
    #[serde(default)]
    pub held_back_versions: Vec<ConfigurationVersion>,
    /// Generate versions in parallel.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Per-version override of generator eligibility for current.
    #[serde(default)]
    pub eligible_for_current: BTreeMap<ConfigurationVersion, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry: None,
            output_dir: None,
            held_back_versions: Vec::new(),
            parallel: default_parallel(),
            eligible_for_current: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load the file layer and apply the process environment.
    ///
    /// An explicit `path` must exist. Without one, `./fedconf.yaml` is used
    /// when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings = serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(settings)
    }

    /// Override settings from environment variables read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(registry) = lookup("FEDCONF_REGISTRY").filter(|v| !v.is_empty()) {
            self.registry = Some(PathBuf::from(registry));
        }
        if let Some(output) = lookup("FEDCONF_OUTPUT_DIR").filter(|v| !v.is_empty()) {
            self.output_dir = Some(PathBuf::from(output));
        }
        if let Some(raw) = lookup("FEDCONF_HELD_BACK_VERSIONS") {
            self.held_back_versions = parse_versions(&raw).map_err(|reason| {
                ConfigError::InvalidEnv {
                    var: "FEDCONF_HELD_BACK_VERSIONS",
                    value: raw.clone(),
                    reason,
                }
            })?;
        }
        Ok(())
    }
}

/// Parse a comma-separated version list. Empty entries are ignored.
pub fn parse_versions(raw: &str) -> Result<Vec<ConfigurationVersion>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ConfigurationVersion>().map_err(|e| e.to_string()))
        .collect()
}
