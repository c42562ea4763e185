// src/license/lease.rs

//! Scoped license acquisition.
//!
//! [`LicenseLease::scope`] activates the license (with retries), runs the
//! wrapped work, and returns the license on every exit path once activation
//! has succeeded:
//! - the work completes (with `Ok` or `Err`),
//! - the work panics (the panic is resumed after the return),
//! - the cancellation future fires (the work is aborted first, which kills
//!   any child process it was waiting on).
//!
//! Returning the license is best effort: failures are logged and never
//! replace the work's own result.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{Instrument, Span, info, warn};

use crate::config::LicenseSettings;
use crate::editor::PlatformLayout;
use crate::errors::{EditorCiError, Result};
use crate::exec::{CommandInvocation, LineFilter, ProcessRunner, RetryPolicy, RunRequest};
use crate::license::annotate::{CiAnnotator, GithubAnnotator};
use crate::license::credential::LicenseCredential;

pub const DEFAULT_LICENSE_MARKER: &str = "[Licensing::Client]";

pub struct LicenseLease {
    runner: Arc<dyn ProcessRunner>,
    credential: LicenseCredential,
    editor: CommandInvocation,
    license_dir_repairs: Vec<CommandInvocation>,
    scratch_project: PathBuf,
    retry: RetryPolicy,
    marker: String,
    annotator: Arc<dyn CiAnnotator>,
    span: Span,
}

/// How the wrapped work left the scope.
enum ScopeExit<T> {
    Finished(Result<T>),
    Panicked(Box<dyn std::any::Any + Send + 'static>),
    Cancelled,
}

impl LicenseLease {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        credential: LicenseCredential,
        layout: &PlatformLayout,
        scratch_project: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            credential,
            editor: layout.editor_command(),
            license_dir_repairs: layout.license_dir_repair_commands(),
            scratch_project: scratch_project.into(),
            retry: RetryPolicy::default(),
            marker: DEFAULT_LICENSE_MARKER.to_string(),
            annotator: Arc::new(GithubAnnotator),
            span: Span::current(),
        }
    }

    pub fn with_settings(mut self, settings: &LicenseSettings) -> Self {
        self.retry = settings.retry;
        self.marker = settings.marker.clone();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_annotator(mut self, annotator: Arc<dyn CiAnnotator>) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run `work` while holding the license.
    pub async fn scope<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.scope_until(work, std::future::pending()).await
    }

    /// Like [`scope`](Self::scope), but gives up on the work when `cancel`
    /// completes and reports `Cancelled` after returning the license.
    pub async fn scope_until<T, F, C>(&self, work: F, cancel: C) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
        C: Future<Output = ()>,
    {
        self.activate().await?;

        let mut handle = tokio::spawn(work.instrument(Span::current()));
        let exit = tokio::select! {
            joined = &mut handle => match joined {
                Ok(result) => ScopeExit::Finished(result),
                Err(e) if e.is_panic() => ScopeExit::Panicked(e.into_panic()),
                Err(_) => ScopeExit::Cancelled,
            },
            () = cancel => {
                warn!(parent: &self.span, "cancellation requested; aborting licensed work");
                handle.abort();
                match handle.await {
                    Err(e) if e.is_panic() => ScopeExit::Panicked(e.into_panic()),
                    _ => ScopeExit::Cancelled,
                }
            }
        };

        self.release().await;

        match exit {
            ScopeExit::Finished(result) => result,
            ScopeExit::Panicked(payload) => std::panic::resume_unwind(payload),
            ScopeExit::Cancelled => Err(EditorCiError::Cancelled),
        }
    }

    /// Mask the serial, repair the shared license directory and activate
    /// with retries.
    pub async fn activate(&self) -> Result<()> {
        if let Some(hidden) = self.credential.hidden_serial_prefix() {
            self.annotator.add_mask(hidden);
        }

        async {
            info!(serial = %self.credential.masked_serial(), "activating license");

            for repair in &self.license_dir_repairs {
                self.runner
                    .run(RunRequest::new(repair.clone()).raise_on_error())
                    .await?;
            }

            let request = RunRequest::new(self.activation_command())
                .filter(LineFilter::contains(self.marker.as_str()))
                .raise_on_error();
            self.retry
                .run("activating license", || self.runner.run(request.clone()))
                .await?;

            info!("license activated");
            Ok::<_, EditorCiError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Return the license. Never fails; problems are logged as warnings.
    pub async fn release(&self) {
        async {
            info!("returning license");
            let request = RunRequest::new(self.return_command())
                .filter(LineFilter::contains(self.marker.as_str()));
            match self.runner.run(request).await {
                Ok(outcome) if outcome.success() => info!("returned license"),
                Ok(outcome) => warn!(
                    exit_code = outcome.exit_code,
                    "error returning license ({}), ignoring", outcome.exit_code
                ),
                Err(e) => warn!(error = %e, "error returning license, ignoring"),
            }
        }
        .instrument(self.span.clone())
        .await
    }

    fn base_command(&self) -> CommandInvocation {
        self.editor
            .clone()
            .args(["-batchmode", "-nographics", "-logFile", "-", "-quit"])
    }

    pub fn activation_command(&self) -> CommandInvocation {
        self.base_command()
            .arg("-serial")
            .secret_arg(self.credential.serial())
            .arg("-username")
            .arg(self.credential.username())
            .arg("-password")
            .hidden_arg(self.credential.password())
            .arg("-projectPath")
            .path_arg(&self.scratch_project)
    }

    pub fn return_command(&self) -> CommandInvocation {
        self.base_command()
            .arg("-returnlicense")
            .arg("-username")
            .arg(self.credential.username())
            .arg("-password")
            .hidden_arg(self.credential.password())
            .arg("-projectPath")
            .path_arg(&self.scratch_project)
    }
}
