// src/settings.rs

//! User settings
//!
//! Read from `$XDG_CONFIG_HOME/hpcpkg/config.toml` when it exists, then
//! overridden by `HPCPKG_REPO` and `HPCPKG_JOBS`. Command-line flags are
//! applied on top by the binary.
//!
//! ```toml
//! repo = "/opt/recipes"
//! jobs = 8
//! compiler = "gcc@8.1.0"
//! ```

use crate::configuration::Compiler;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the recipe directory
pub const REPO_ENV: &str = "HPCPKG_REPO";
/// Environment variable overriding the number of build jobs
pub const JOBS_ENV: &str = "HPCPKG_JOBS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Recipe directory
    #[serde(default)]
    pub repo: Option<PathBuf>,

    /// Parallel build jobs; defaults to the number of CPUs
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Default compiler, e.g. `gcc@8.1.0`
    #[serde(default)]
    pub compiler: Option<String>,
}

impl Settings {
    /// The settings file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hpcpkg").join("config.toml"))
    }

    /// Load the settings file and apply environment overrides
    pub fn load() -> Result<Self> {
        let settings = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load one settings file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Settings(format!("cannot read {}: {}", path.display(), e)))?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| Error::Settings(format!("{}: {}", path.display(), e)))?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `HPCPKG_REPO` / `HPCPKG_JOBS` as returned by `lookup`
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(repo) = lookup(REPO_ENV).filter(|s| !s.is_empty()) {
            self.repo = Some(PathBuf::from(repo));
        }

        if let Some(jobs) = lookup(JOBS_ENV).filter(|s| !s.is_empty()) {
            let jobs: usize = jobs
                .parse()
                .map_err(|_| Error::Settings(format!("{} must be a number, got '{}'", JOBS_ENV, jobs)))?;
            self.jobs = Some(jobs);
        }

        if self.jobs == Some(0) {
            return Err(Error::Settings("jobs must be at least 1".to_string()));
        }

        Ok(self)
    }

    /// Effective number of build jobs
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// The configured default compiler, parsed
    pub fn compiler(&self) -> Result<Option<Compiler>> {
        self.compiler.as_deref().map(Compiler::parse).transpose()
    }

    /// Recipe directory, falling back to `./recipes`
    pub fn repo_dir(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| PathBuf::from("recipes"))
    }
}
