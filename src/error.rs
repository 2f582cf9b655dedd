//! Error handling module for hostprep
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Library operations return [`Result`]; the binary wraps them in `anyhow`
//! for top-level context.

use std::path::PathBuf;

use thiserror::Error;

use crate::install_state::InstallStage;

/// Main error type for hostprep
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Filesystem operation failed on a specific path
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External command could not be started
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External command exited unsuccessfully
    #[error("`{program}` failed (exit code {code}): {stderr}")]
    Command {
        program: String,
        code: i32,
        stderr: String,
    },

    /// Validation errors (config values, CLI overrides)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Installer stage machine rejected a transition
    #[error("Install transition error: {0}")]
    InstallTransition(String),

    /// Failure inside a named installer stage
    #[error("{stage} failed")]
    Stage {
        stage: InstallStage,
        #[source]
        source: Box<ProvisionError>,
    },
}

/// Result type alias for hostprep operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Wrap an io error with the action and path it happened on
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Attach the installer stage that was running when this error occurred
    pub fn in_stage(self, stage: InstallStage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The installer stage this error was raised in, if any
    pub fn stage(&self) -> Option<InstallStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
