// src/exec/runner.rs

//! Pluggable process runner abstraction.
//!
//! Everything that launches an external program goes through a
//! [`ProcessRunner`]. Production code uses
//! [`ProcessSupervisor`](super::supervisor::ProcessSupervisor); tests provide
//! a fake that records requests and replays scripted exit codes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::Result;
use crate::exec::invocation::CommandInvocation;

/// Decides which output lines are forwarded to the live logger.
///
/// The persisted transcript always receives every line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LineFilter {
    /// Forward every line.
    #[default]
    All,
    /// Forward nothing.
    Nothing,
    /// Forward lines containing this marker.
    Contains(String),
}

impl LineFilter {
    pub fn contains(marker: impl Into<String>) -> Self {
        LineFilter::Contains(marker.into())
    }

    pub fn matches(&self, line: &str) -> bool {
        match self {
            LineFilter::All => true,
            LineFilter::Nothing => false,
            LineFilter::Contains(marker) => line.contains(marker.as_str()),
        }
    }
}

/// One call to the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub invocation: CommandInvocation,
    pub filter: LineFilter,
    pub log_path: Option<PathBuf>,
    pub raise_on_error: bool,
}

impl RunRequest {
    pub fn new(invocation: CommandInvocation) -> Self {
        Self {
            invocation,
            filter: LineFilter::All,
            log_path: None,
            raise_on_error: false,
        }
    }

    pub fn filter(mut self, filter: LineFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Persist the full transcript to `path` (parent dirs are created).
    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Turn a non-zero exit code into `CommandFailed`.
    pub fn raise_on_error(mut self) -> Self {
        self.raise_on_error = true;
        self
    }
}

/// Result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub log_path: Option<PathBuf>,
}

impl ExecutionOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait abstracting how external commands are executed.
pub trait ProcessRunner: Send + Sync {
    /// Run the request to completion.
    ///
    /// Implementations must return `CommandFailed` for a non-zero exit code
    /// when `raise_on_error` is set, and return the outcome otherwise.
    fn run<'a>(
        &'a self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionOutcome>> + Send + 'a>>;
}
