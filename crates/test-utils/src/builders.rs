#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use editor_ci::config::{TestSettings, WorkspacePaths};
use editor_ci::editor::{Architecture, EditorRuntime, HostPlatform, PlatformLayout};
use editor_ci::exec::ProcessRunner;
use editor_ci::types::BuildTarget;

/// Builder for an `EditorRuntime` rooted in a temp directory.
///
/// Layout under the temp dir:
/// - `editors/<version>/Editor/Unity` (only if `installed(true)`)
/// - `checkout/UnityProjects/<year>` (only if `with_project(true)`)
/// - `checkout/build`
pub struct RuntimeBuilder {
    version: String,
    installed: bool,
    project: bool,
    test: Option<TestSettings>,
}

/// A built runtime plus the temp dir keeping its paths alive.
pub struct TestRuntime {
    pub runtime: EditorRuntime,
    pub dir: TempDir,
}

impl TestRuntime {
    pub fn paths(&self) -> &WorkspacePaths {
        self.runtime.paths()
    }
}

impl RuntimeBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            installed: false,
            project: true,
            test: None,
        }
    }

    pub fn installed(mut self, val: bool) -> Self {
        self.installed = val;
        self
    }

    pub fn with_project(mut self, val: bool) -> Self {
        self.project = val;
        self
    }

    pub fn test_settings(mut self, test: TestSettings) -> Self {
        self.test = Some(test);
        self
    }

    pub fn build(self, runner: Arc<dyn ProcessRunner>) -> TestRuntime {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = PlatformLayout::under_root(
            HostPlatform::Linux,
            Architecture::X86_64,
            &dir.path().join("editors"),
            &self.version,
        );
        if self.installed {
            touch(&layout.editor_binary);
        }

        let paths = WorkspacePaths::under(dir.path().join("checkout"));
        if self.project {
            let year = self.version.split('.').next().unwrap_or(&self.version);
            fs::create_dir_all(paths.projects.join(year)).expect("create project dir");
        }

        let mut runtime = EditorRuntime::new(&self.version, layout, paths, runner);
        if let Some(test) = self.test {
            runtime = runtime.with_test_settings(test);
        }
        TestRuntime { runtime, dir }
    }
}

/// Test settings with the given build targets and no deadline.
pub fn test_settings(build_targets: &[BuildTarget]) -> TestSettings {
    TestSettings {
        marker: "[Test Profiler]".to_string(),
        build_targets: build_targets.to_vec(),
        assembly_filters: "+Embrace,+Embrace.*".to_string(),
        timeout: None,
    }
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, b"").expect("create file");
}
