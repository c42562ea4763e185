// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::exec::RetryPolicy;
use crate::types::{BuildTarget, EditorModule};

/// Configuration as read from `EditorCi.toml`.
///
/// ```toml
/// [paths]
/// base = "."
/// build = "build"
/// projects = "UnityProjects"
///
/// [license]
/// max_attempts = 5
/// delay_seconds = 15
///
/// [test]
/// build_targets = ["android", "ios"]
/// timeout_minutes = 90
/// ```
///
/// Every section is optional and defaulted.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub license: LicenseSection,
    #[serde(default)]
    pub test: TestSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub install: InstallSection,
}

/// `[paths]` section. Relative `build`/`projects` are resolved against `base`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    pub base: Option<PathBuf>,
    pub build: Option<PathBuf>,
    pub projects: Option<PathBuf>,
}

/// `[license]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseSection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    /// Only output lines containing this marker reach the console.
    #[serde(default = "default_license_marker")]
    pub marker: String,
}

fn default_max_attempts() -> u32 {
    crate::exec::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_delay_seconds() -> u64 {
    crate::exec::retry::DEFAULT_DELAY.as_secs()
}

fn default_license_marker() -> String {
    "[Licensing::Client]".to_string()
}

impl Default for LicenseSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_seconds: default_delay_seconds(),
            marker: default_license_marker(),
        }
    }
}

/// `[test]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    #[serde(default = "default_test_marker")]
    pub marker: String,
    #[serde(default = "BuildTarget::defaults")]
    pub build_targets: Vec<BuildTarget>,
    #[serde(default = "default_assembly_filters")]
    pub assembly_filters: String,
    /// Per-cell deadline; unset means wait forever.
    #[serde(default)]
    pub timeout_minutes: Option<u64>,
}

fn default_test_marker() -> String {
    "[Test Profiler]".to_string()
}

fn default_assembly_filters() -> String {
    "+Embrace,+Embrace.*".to_string()
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            marker: default_test_marker(),
            build_targets: BuildTarget::defaults(),
            assembly_filters: default_assembly_filters(),
            timeout_minutes: None,
        }
    }
}

/// `[build]` section, used by the package export.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Relative to `paths.base`.
    #[serde(default = "default_package_manifest")]
    pub package_manifest: PathBuf,
    #[serde(default = "default_execute_method")]
    pub execute_method: String,
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,
    /// Project directory (under `paths.projects`) the export runs in.
    #[serde(default = "default_build_project")]
    pub project: String,
    #[serde(default = "default_build_target")]
    pub build_target: BuildTarget,
}

fn default_package_manifest() -> PathBuf {
    PathBuf::from("io.embrace.sdk/package.json")
}

fn default_execute_method() -> String {
    "EmbraceSDK.CIPublishTool.ExportUnityPackage".to_string()
}

fn default_artifact_prefix() -> String {
    "EmbraceSDK".to_string()
}

fn default_build_project() -> String {
    "2021".to_string()
}

fn default_build_target() -> BuildTarget {
    BuildTarget::Android
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            package_manifest: default_package_manifest(),
            execute_method: default_execute_method(),
            artifact_prefix: default_artifact_prefix(),
            project: default_build_project(),
            build_target: default_build_target(),
        }
    }
}

/// `[install]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    #[serde(default = "EditorModule::defaults")]
    pub modules: Vec<EditorModule>,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            modules: EditorModule::defaults(),
        }
    }
}

/// Filesystem layout of the checkout and its build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    /// Checkout root; coverage paths are stripped relative to it.
    pub base: PathBuf,
    /// Build/log output root.
    pub build: PathBuf,
    /// Directory holding one project per editor year.
    pub projects: PathBuf,
}

impl WorkspacePaths {
    /// Conventional layout: `<base>/build` and `<base>/UnityProjects`.
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            build: base.join("build"),
            projects: base.join("UnityProjects"),
            base,
        }
    }

    pub fn test_results_file(&self, run_id: &str) -> PathBuf {
        self.build.join("test-results").join(format!("{run_id}.xml"))
    }

    pub fn coverage_results_dir(&self, run_id: &str) -> PathBuf {
        self.build.join("coverage-results").join(run_id)
    }

    pub fn test_log_file(&self, run_id: &str) -> PathBuf {
        self.build.join("test-logs").join(format!("{run_id}.log"))
    }

    pub fn build_log_file(&self) -> PathBuf {
        self.build.join("build.log")
    }

    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.base.join(relative)
    }
}

/// License activation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseSettings {
    pub retry: RetryPolicy,
    pub marker: String,
}

/// Test matrix settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSettings {
    pub marker: String,
    pub build_targets: Vec<BuildTarget>,
    pub assembly_filters: String,
    pub timeout: Option<Duration>,
}

/// Validated configuration used by the rest of the crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: WorkspacePaths,
    pub license: LicenseSettings,
    pub test: TestSettings,
    pub build: BuildSection,
    pub install: InstallSection,
}
