//! Error types for reprise-core
//!
//! Failures of the retried operation are never wrapped in these types; they
//! reach the caller verbatim. This enum only covers setup: building policies,
//! configuring a [`Retry`](crate::retry::Retry) and loading configuration.

use thiserror::Error;

/// Result type alias using reprise-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors for reprise
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Max attempt count of zero
    #[error("Max attempt count must be at least 1 (use -1 for unbounded)")]
    ZeroAttempts,

    /// Kind filter that names no failure kind
    #[error("Failure kind filter must name at least one kind")]
    EmptyKindFilter,

    /// Name that does not denote a failure kind
    #[error("Unknown failure kind: {name}")]
    UnknownFailureKind { name: String },

    /// Unknown hook name
    #[error("Unknown hook: {name}. Available hooks: before-pause, after-pause")]
    UnknownHook { name: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unknown failure kind error
    pub fn unknown_failure_kind(name: impl Into<String>) -> Self {
        Self::UnknownFailureKind { name: name.into() }
    }

    /// Create an unknown hook error
    pub fn unknown_hook(name: impl Into<String>) -> Self {
        Self::UnknownHook { name: name.into() }
    }
}
