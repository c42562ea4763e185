#![allow(dead_code)]

use std::path::Path;

use editor_ci::exec::CommandInvocation;

pub use editor_ci_test_utils::builders::{self, RuntimeBuilder, test_settings};
pub use editor_ci_test_utils::{
    CapturedEvents, EventLog, FakeResponse, FakeRunner, RecordingAnnotator, init_tracing, with_timeout,
};

/// `sh -c <script>` invocation.
pub fn sh(script: &str) -> CommandInvocation {
    CommandInvocation::new("sh").args(["-c", script])
}

pub fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read transcript")
}
