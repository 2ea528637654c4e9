//! Retry configuration loader with precedence
//!
//! Settings are resolved from the following sources (low to high):
//! 1. Built-in defaults (everything unbounded, no pause, any failure kind)
//! 2. A YAML file: an explicit path, or `reprise.yaml` / `reprise.yml`
//!    found by walking up from the start directory
//! 3. Environment variables (REPRISE_* prefix), applied to `default` and
//!    to every named operation
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::{RetryProfiles, RetrySettings};
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;

/// File names searched for, in order, in each directory
pub const CONFIG_FILE_NAMES: &[&str] = &["reprise.yaml", "reprise.yml"];

const ENV_TIMEOUT_US: &str = "REPRISE_TIMEOUT_US";
const ENV_MAX_ATTEMPTS: &str = "REPRISE_MAX_ATTEMPTS";
const ENV_PAUSE_US: &str = "REPRISE_PAUSE_US";
const ENV_CATCH_ONLY: &str = "REPRISE_CATCH_ONLY";

/// Loads [`RetryProfiles`] from files and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Directory the file search starts from
    start_dir: Utf8PathBuf,
    /// File given explicitly, bypassing the search
    config_file: Option<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that searches from the current directory
    pub fn new() -> Result<Self> {
        let cwd = env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))?;
        Ok(Self::with_dir(cwd))
    }

    /// Create a loader that searches from `start_dir`
    pub fn with_dir(start_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            config_file: None,
        }
    }

    /// Use `path` instead of searching; it must exist
    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Resolve the configuration file, if there is one
    pub fn config_path(&self) -> Result<Option<Utf8PathBuf>> {
        if let Some(path) = &self.config_file {
            if !path.is_file() {
                return Err(Error::config_not_found(path.as_str()));
            }
            return Ok(Some(path.clone()));
        }
        Ok(Self::find_config(&self.start_dir))
    }

    /// Walk up from `dir` looking for a configuration file
    fn find_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(dir);

        while let Some(dir) = current {
            for name in CONFIG_FILE_NAMES {
                let path = dir.join(name);
                if path.is_file() {
                    return Some(path);
                }
            }
            current = dir.parent();
        }

        None
    }

    /// Load retry profiles with precedence applied and validate them
    pub fn load(&self) -> Result<RetryProfiles> {
        let mut profiles = RetryProfiles::default();

        match self.config_path()? {
            Some(path) => {
                tracing::debug!(path = %path, "loading retry configuration");
                profiles = profiles.merge(Self::load_yaml_file(&path)?);
            }
            None => {
                tracing::debug!(start_dir = %self.start_dir, "no configuration file found");
            }
        }

        let profiles = Self::apply_env_overrides(profiles)?;
        profiles.validate()?;
        Ok(profiles)
    }

    /// Read and parse a YAML file
    fn load_yaml_file(path: &Utf8Path) -> Result<RetryProfiles> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(RetryProfiles::default());
        }
        Ok(serde_yaml_ng::from_str(&content)?)
    }

    /// Load and resolve the settings for one operation
    ///
    /// Falls back to `default` when the file has no entry for `operation`.
    pub fn load_operation(&self, operation: &str) -> Result<RetrySettings> {
        let profiles = self.load()?;
        if !profiles.operations.contains_key(operation) {
            tracing::debug!(operation = %operation, "no settings for operation, using defaults");
        }
        Ok(profiles.for_operation(operation).clone())
    }

    /// Apply REPRISE_* overrides to every settings entry
    fn apply_env_overrides(mut profiles: RetryProfiles) -> Result<RetryProfiles> {
        let overrides = EnvOverrides::from_env()?;

        overrides.apply(&mut profiles.default);
        for settings in profiles.operations.values_mut() {
            overrides.apply(settings);
        }

        Ok(profiles)
    }
}

/// REPRISE_* values read from the environment
#[derive(Debug, Default)]
struct EnvOverrides {
    timeout_us: Option<i64>,
    max_attempts: Option<i64>,
    pause_us: Option<u64>,
    catch_only: Option<Vec<String>>,
}

impl EnvOverrides {
    fn from_env() -> Result<Self> {
        let mut overrides = Self::default();

        if let Ok(val) = env::var(ENV_TIMEOUT_US) {
            overrides.timeout_us = Some(val.trim().parse().map_err(|_| {
                Error::invalid_config(format!("{} must be a valid number", ENV_TIMEOUT_US))
            })?);
        }

        if let Ok(val) = env::var(ENV_MAX_ATTEMPTS) {
            overrides.max_attempts = Some(val.trim().parse().map_err(|_| {
                Error::invalid_config(format!("{} must be a valid number", ENV_MAX_ATTEMPTS))
            })?);
        }

        if let Ok(val) = env::var(ENV_PAUSE_US) {
            overrides.pause_us = Some(val.trim().parse().map_err(|_| {
                Error::invalid_config(format!(
                    "{} must be a non-negative number",
                    ENV_PAUSE_US
                ))
            })?);
        }

        if let Ok(val) = env::var(ENV_CATCH_ONLY) {
            overrides.catch_only = Some(
                val.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }

        Ok(overrides)
    }

    fn apply(&self, settings: &mut RetrySettings) {
        if let Some(timeout_us) = self.timeout_us {
            settings.timeout_us = timeout_us;
        }
        if let Some(max_attempts) = self.max_attempts {
            settings.max_attempts = max_attempts;
        }
        if let Some(pause_us) = self.pause_us {
            settings.pause_us = pause_us;
        }
        if let Some(catch_only) = &self.catch_only {
            settings.catch_only = catch_only.clone();
        }
    }
}
