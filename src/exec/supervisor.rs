// src/exec/supervisor.rs

//! Real process runner.
//!
//! Spawns the child with stdout and stderr piped, merges both into one
//! line stream, and for every line:
//! - appends the raw bytes to the transcript file (flushed immediately),
//! - forwards the trimmed text to `tracing` at debug level if the request's
//!   [`LineFilter`](super::runner::LineFilter) matches.
//!
//! On unix the child leads its own process group. A deadline, or dropping
//! the future (cancellation), kills the whole group.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{EditorCiError, Result};
use crate::exec::runner::{ExecutionOutcome, ProcessRunner, RunRequest};

/// Capacity of the merged line channel. Readers wait when the sink lags.
const LINE_BUFFER: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self
    }

    /// Run a single command to completion.
    ///
    /// Errors:
    /// - `Spawn` if the program could not be started (no transcript is created),
    /// - `CommandTimedOut` if the invocation's deadline expired (its process group is killed),
    /// - `CommandFailed` for a non-zero exit when `raise_on_error` is set.
    pub async fn execute(&self, request: RunRequest) -> Result<ExecutionOutcome> {
        let invocation = &request.invocation;
        let command = invocation.to_string();
        debug!(cmd = %command, "starting process");

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = invocation.working_dir() {
            cmd.current_dir(dir);
        }
        for (key, value) in invocation.env_overrides() {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| EditorCiError::Spawn {
            command: command.clone(),
            source,
        })?;
        let mut group = ProcessGroup::of(&child, &command);

        let mut transcript = match &request.log_path {
            Some(path) => Some(open_transcript(path).await?),
            None => None,
        };
        let mut lines = merged_lines(&mut child);

        let consume = async {
            while let Some(line) = lines.recv().await {
                if let Some(file) = transcript.as_mut() {
                    file.write_all(&line).await?;
                    file.flush().await?;
                }
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end_matches(['\r', '\n']);
                if request.filter.matches(text) {
                    debug!("{text}");
                }
            }
            child.wait().await
        };

        let waited = match invocation.deadline() {
            Some(limit) => tokio::time::timeout(limit, consume).await.ok(),
            None => Some(consume.await),
        };
        let status = match waited {
            Some(status) => status?,
            None => {
                let limit = invocation.deadline().unwrap_or_default();
                warn!(cmd = %command, timeout = ?limit, "deadline expired; killing process group");
                group.kill();
                if let Err(e) = child.kill().await {
                    warn!(cmd = %command, error = %e, "failed to kill timed-out process");
                }
                return Err(EditorCiError::CommandTimedOut {
                    command,
                    timeout: limit,
                });
            }
        };

        group.disarm();
        let exit_code = status.code().unwrap_or(-1);
        debug!(cmd = %command, exit_code, "process exited");

        if request.raise_on_error && exit_code != 0 {
            return Err(EditorCiError::CommandFailed { command, exit_code });
        }

        Ok(ExecutionOutcome {
            exit_code,
            log_path: request.log_path,
        })
    }
}

impl ProcessRunner for ProcessSupervisor {
    fn run<'a>(
        &'a self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionOutcome>> + Send + 'a>> {
        Box::pin(self.execute(request))
    }
}

/// The child's process group, killed on drop unless the child was reaped.
///
/// The editor is usually a grandchild (e.g. under `xvfb-run`), so killing
/// only the direct child would leave it holding the license, the project
/// lock and our output pipes.
struct ProcessGroup {
    pgid: Option<u32>,
    command: String,
}

impl ProcessGroup {
    fn of(child: &Child, command: &str) -> Self {
        Self {
            pgid: child.id(),
            command: command.to_string(),
        }
    }

    /// Stop tracking the group once the child has exited normally.
    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            if let Err(e) = kill_group(pgid) {
                warn!(cmd = %self.command, pgid, error = %e, "failed to kill process group");
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pgid).map_err(std::io::Error::other)?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) -> std::io::Result<()> {
    Ok(())
}

async fn open_transcript(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(File::create(path).await?)
}

/// Merge the child's stdout and stderr into one channel of raw lines.
///
/// The channel closes once both streams reach end-of-file.
fn merged_lines(child: &mut Child) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, tx);
    }
    rx
}

fn spawn_line_reader<R>(stream: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "error reading child output; closing stream");
                    break;
                }
            }
        }
    });
}
