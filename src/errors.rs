// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorCiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credentials: {} must be set in the environment", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("Project not found: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("Unsupported host platform: {0}")]
    UnsupportedPlatform(String),

    /// `command` is the redacted rendering of the invocation.
    #[error("Command failed with exit code {exit_code}: {command}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("Command timed out after {timeout:?}: {command}")]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("Failed to start command: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid run identifier: {0}")]
    InvalidRunIdentifier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EditorCiError {
    /// Exit code carried by a failed command, if this is one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            EditorCiError::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EditorCiError>;
