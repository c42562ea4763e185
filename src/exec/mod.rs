// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`invocation`] describes a command line (with masked secret arguments).
//! - [`runner`] defines the `ProcessRunner` trait, run requests and outcomes,
//!   so tests can swap in a fake runner.
//! - [`supervisor`] is the real runner built on `tokio::process::Command`.
//! - [`retry`] wraps fallible operations in a bounded retry loop.

pub mod invocation;
pub mod retry;
pub mod runner;
pub mod supervisor;

pub use invocation::{Arg, CommandInvocation, mask_secret};
pub use retry::RetryPolicy;
pub use runner::{ExecutionOutcome, LineFilter, ProcessRunner, RunRequest};
pub use supervisor::ProcessSupervisor;
