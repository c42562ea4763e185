// tests/process_supervisor.rs

#![cfg(unix)]

mod common;
use crate::common::{init_tracing, read_log, sh, with_timeout};

use std::error::Error;
use std::time::{Duration, Instant};

use tempfile::tempdir;

use editor_ci::errors::EditorCiError;
use editor_ci::exec::{CommandInvocation, LineFilter, ProcessSupervisor, RunRequest};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn transcript_holds_stdout_and_stderr_in_order() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let log = dir.path().join("out.log");

    let request = RunRequest::new(sh(
        "echo one; sleep 0.1; echo two >&2; sleep 0.1; echo three",
    ))
    .filter(LineFilter::contains("t"))
    .log_to(&log);
    let outcome = ProcessSupervisor::new().execute(request).await?;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.log_path.as_deref(), Some(log.as_path()));
    assert_eq!(read_log(&log), "one\ntwo\nthree\n");
    Ok(())
}

#[tokio::test]
async fn transcript_keeps_raw_bytes_and_partial_last_line() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let log = dir.path().join("raw.log");

    let request = RunRequest::new(sh("printf 'caf\\303\\251\\r\\nno newline'")).log_to(&log);
    ProcessSupervisor::new().execute(request).await?;

    assert_eq!(std::fs::read(&log)?, "café\r\nno newline".as_bytes());
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_returned_without_raise() -> TestResult {
    init_tracing();
    let outcome = ProcessSupervisor::new()
        .execute(RunRequest::new(sh("exit 3")))
        .await?;

    assert_eq!(outcome.exit_code, 3);
    assert!(!outcome.success());
    assert_eq!(outcome.log_path, None);
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_raises_command_failed_with_exact_code() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = dir.path().join("fail.log");

    let result = ProcessSupervisor::new()
        .execute(
            RunRequest::new(sh("echo partial; exit 7"))
                .log_to(&log)
                .raise_on_error(),
        )
        .await;

    match result {
        Err(EditorCiError::CommandFailed { command, exit_code }) => {
            assert_eq!(exit_code, 7);
            assert!(command.starts_with("sh -c"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
    // Output produced before the failure is still on disk.
    assert_eq!(read_log(&log), "partial\n");
}

#[tokio::test]
async fn spawn_failure_creates_no_transcript() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = dir.path().join("never").join("spawn.log");

    let result = ProcessSupervisor::new()
        .execute(
            RunRequest::new(CommandInvocation::new("/definitely/not/a/real/program"))
                .log_to(&log),
        )
        .await;

    assert!(
        matches!(result, Err(EditorCiError::Spawn { .. })),
        "expected Spawn error, got {result:?}"
    );
    assert!(!log.exists());
    assert!(!log.parent().unwrap().exists());
}

#[tokio::test]
async fn transcript_parent_directories_are_created() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let log = dir.path().join("a").join("b").join("c.log");

    ProcessSupervisor::new()
        .execute(RunRequest::new(sh("echo nested")).log_to(&log))
        .await?;

    assert_eq!(read_log(&log), "nested\n");
    Ok(())
}

#[tokio::test]
async fn deadline_kills_long_running_process() {
    init_tracing();
    let started = Instant::now();

    let result = with_timeout(ProcessSupervisor::new().execute(RunRequest::new(
        sh("exec sleep 30").timeout(Duration::from_millis(200)),
    )))
    .await;

    match result {
        Err(EditorCiError::CommandTimedOut { timeout, .. }) => {
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("expected CommandTimedOut, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn environment_and_working_directory_are_applied() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let log = dir.path().join("env.log");

    let invocation = sh("echo \"$GREETING\"; pwd")
        .env("GREETING", "hello")
        .current_dir(dir.path());
    ProcessSupervisor::new()
        .execute(RunRequest::new(invocation).log_to(&log))
        .await?;

    let text = read_log(&log);
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("hello"));
    let cwd = std::fs::canonicalize(lines.next().unwrap_or_default())?;
    assert_eq!(cwd, std::fs::canonicalize(dir.path())?);
    Ok(())
}

/// True while `pid` exists and is not a zombie.
#[cfg(target_os = "linux")]
fn is_running(pid: &str) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
async fn wait_until_gone(pid: &str) -> bool {
    for _ in 0..40 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// A background process standing in for the editor that `xvfb-run` launches.
#[cfg(target_os = "linux")]
fn spawns_grandchild(dir: &std::path::Path) -> CommandInvocation {
    sh("sleep 30 & echo $! > grandchild.pid; wait").current_dir(dir)
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn deadline_kills_grandchildren_too() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    let result = with_timeout(ProcessSupervisor::new().execute(RunRequest::new(
        spawns_grandchild(dir.path()).timeout(Duration::from_millis(300)),
    )))
    .await;
    assert!(
        matches!(result, Err(EditorCiError::CommandTimedOut { .. })),
        "got {result:?}"
    );

    let pid = std::fs::read_to_string(dir.path().join("grandchild.pid"))?;
    let pid = pid.trim();
    assert!(wait_until_gone(pid).await, "grandchild {pid} survived the deadline");
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn dropping_the_run_kills_grandchildren() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    let supervisor = ProcessSupervisor::new();
    let abandoned = tokio::time::timeout(
        Duration::from_millis(300),
        supervisor.execute(RunRequest::new(spawns_grandchild(dir.path()))),
    )
    .await;
    assert!(abandoned.is_err(), "sleep 30 cannot finish in 300ms");

    let pid = std::fs::read_to_string(dir.path().join("grandchild.pid"))?;
    let pid = pid.trim();
    assert!(wait_until_gone(pid).await, "grandchild {pid} survived cancellation");
    Ok(())
}
