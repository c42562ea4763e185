// src/editor/runtime.rs

//! Editor installation state and single-invocation operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::fs;
use tracing::{Instrument, Span, info, info_span, warn};

use crate::config::{BuildSection, TestSettings, WorkspacePaths};
use crate::editor::platform::PlatformLayout;
use crate::editor::project::{read_package_version, resolve_project_dir};
use crate::errors::{EditorCiError, Result};
use crate::exec::{CommandInvocation, LineFilter, ProcessRunner, RunRequest};
use crate::matrix::{MatrixReport, RunId, run_matrix};
use crate::types::{BuildTarget, EditorModule, TestPlatform};

pub const DEFAULT_TEST_MARKER: &str = "[Test Profiler]";
pub const DEFAULT_ASSEMBLY_FILTERS: &str = "+Embrace,+Embrace.*";

/// One editor version on this machine.
///
/// Installation state is never cached: every check looks at the binary on
/// disk, so repeated `install`/`uninstall` calls are idempotent.
pub struct EditorRuntime {
    version: String,
    layout: PlatformLayout,
    paths: WorkspacePaths,
    test: TestSettings,
    runner: Arc<dyn ProcessRunner>,
    span: Span,
}

impl EditorRuntime {
    pub fn new(
        version: impl Into<String>,
        layout: PlatformLayout,
        paths: WorkspacePaths,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let version = version.into();
        let span = info_span!("editor", version = %version);
        Self {
            version,
            layout,
            paths,
            test: TestSettings {
                marker: DEFAULT_TEST_MARKER.to_string(),
                build_targets: BuildTarget::defaults(),
                assembly_filters: DEFAULT_ASSEMBLY_FILTERS.to_string(),
                timeout: None,
            },
            runner,
            span,
        }
    }

    pub fn with_test_settings(mut self, test: TestSettings) -> Self {
        self.test = test;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn layout(&self) -> &PlatformLayout {
        &self.layout
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    pub fn test_settings(&self) -> &TestSettings {
        &self.test
    }

    /// Logging context of this editor; child operations nest under it.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    pub fn is_installed(&self) -> bool {
        self.layout.editor_binary.exists()
    }

    /// Install through the hub CLI unless the editor binary already exists.
    pub async fn install(&self, changeset: &str, modules: &[EditorModule]) -> Result<()> {
        async {
            if self.is_installed() {
                info!("editor is already installed");
                return Ok(());
            }
            info!(changeset, "installing editor");
            self.runner
                .run(RunRequest::new(self.install_command(changeset, modules)).raise_on_error())
                .await?;
            info!("installed editor");
            Ok::<_, EditorCiError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Remove the installation directory unless the editor is absent.
    pub async fn uninstall(&self) -> Result<()> {
        async {
            if !self.is_installed() {
                info!("editor is not installed");
                return Ok(());
            }
            info!(dir = %self.layout.editor_dir.display(), "uninstalling editor");
            let remove = self.layout.remove_tree_command(&self.layout.editor_dir);
            self.runner
                .run(RunRequest::new(remove).raise_on_error())
                .await?;
            info!("uninstalled editor");
            Ok::<_, EditorCiError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    pub fn install_command(&self, changeset: &str, modules: &[EditorModule]) -> CommandInvocation {
        let mut hub_args: Vec<String> = [
            "--headless",
            "install",
            "--version",
            self.version.as_str(),
            "--changeset",
            changeset,
            "--architecture",
            self.layout.architecture.as_str(),
            "--childModules",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for module in modules {
            hub_args.push("--module".to_string());
            hub_args.push(module.as_str().to_string());
        }
        self.layout.hub_command(&hub_args)
    }

    /// Run one test cell. Assumes a license is held.
    ///
    /// A non-zero exit code is an expected outcome: it is logged as a warning
    /// and returned, never raised. Errors are reserved for runs that could not
    /// complete at all (spawn failure, deadline).
    pub async fn run_test(
        &self,
        run_id: &RunId,
        project_path: &Path,
        build_target: BuildTarget,
        test_platform: TestPlatform,
        coverage: bool,
    ) -> Result<i32> {
        let cell_span = info_span!(parent: &self.span, "cell", run_id = %run_id);
        async {
            info!("running tests for {run_id}");
            fs::create_dir_all(&self.paths.build).await?;

            let mut invocation =
                self.test_command(run_id, project_path, build_target, test_platform, coverage);
            if let Some(limit) = self.test.timeout {
                invocation = invocation.timeout(limit);
            }
            let request = RunRequest::new(invocation)
                .filter(LineFilter::contains(self.test.marker.as_str()))
                .log_to(self.paths.test_log_file(run_id.as_str()));

            let outcome = self.runner.run(request).await?;
            if outcome.success() {
                info!("tests passed for {run_id}");
            } else {
                warn!(exit_code = outcome.exit_code, "tests failed for {run_id}");
            }
            Ok::<_, EditorCiError>(outcome.exit_code)
        }
        .instrument(cell_span)
        .await
    }

    pub fn test_command(
        &self,
        run_id: &RunId,
        project_path: &Path,
        build_target: BuildTarget,
        test_platform: TestPlatform,
        coverage: bool,
    ) -> CommandInvocation {
        let mut invocation = self
            .layout
            .editor_command()
            .args(["-batchmode", "-nographics", "-logFile", "-", "-projectPath"])
            .path_arg(project_path)
            .args(["-buildTarget", build_target.as_str()])
            .arg("-runTests")
            .args(["-testPlatform", test_platform.as_str()])
            .arg("-testResults")
            .path_arg(&self.paths.test_results_file(run_id.as_str()));

        if coverage {
            let options = [
                "generateAdditionalMetrics".to_string(),
                format!("assemblyFilters:{}", self.test.assembly_filters),
                format!("pathStrippingPatterns:{}", self.paths.base.display()),
            ]
            .join(";");
            invocation = invocation
                .args(["-debugCodeOptimization", "-enableCodeCoverage"])
                .arg("-coverageResultsPath")
                .path_arg(&self.paths.coverage_results_dir(run_id.as_str()))
                .arg("-coverageOptions")
                .arg(options);
        }
        invocation
    }

    /// Run the whole build-target x test-platform matrix for this version.
    pub async fn run_tests(&self, build_targets: &[BuildTarget], coverage: bool) -> Result<MatrixReport> {
        run_matrix(self, build_targets, coverage).await
    }

    /// Export the package and move the artifact into the build root.
    ///
    /// Returns the artifact path.
    pub async fn export_package(&self, build: &BuildSection) -> Result<PathBuf> {
        async {
            let manifest = self.paths.resolve(&build.package_manifest);
            let version = read_package_version(&manifest)?;
            let filename = format!("{}_{}.unitypackage", build.artifact_prefix, version);
            info!("building {filename}");

            let project = resolve_project_dir(&self.paths.projects, &build.project)?;
            fs::create_dir_all(&self.paths.build).await?;

            let invocation = self
                .layout
                .editor_command()
                .arg("-batchmode")
                .args(["-buildTarget", build.build_target.as_str()])
                .args(["-executeMethod", build.execute_method.as_str()])
                .args(["-logFile", "-", "-nographics", "-projectPath"])
                .path_arg(&project)
                .arg("-quit");
            self.runner
                .run(
                    RunRequest::new(invocation)
                        .log_to(self.paths.build_log_file())
                        .raise_on_error(),
                )
                .await?;

            let produced = project.join(&filename);
            let artifact = self.paths.build.join(&filename);
            move_file(&produced, &artifact).await?;
            info!(artifact = %artifact.display(), "built package");
            Ok::<_, EditorCiError>(artifact)
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Rename, falling back to copy + delete across filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .await
        .with_context(|| format!("moving {} to {}", from.display(), to.display()))?;
    fs::remove_file(from)
        .await
        .with_context(|| format!("removing {}", from.display()))?;
    Ok(())
}
