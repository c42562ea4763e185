// tests/editor_runtime.rs

mod common;
use crate::common::{FakeRunner, RuntimeBuilder, init_tracing, test_settings};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use editor_ci::config::BuildSection;
use editor_ci::errors::EditorCiError;
use editor_ci::matrix::RunId;
use editor_ci::types::{BuildTarget, EditorModule, TestPlatform};

type TestResult = Result<(), Box<dyn Error>>;

const VERSION: &str = "2021.3.45f1";

#[tokio::test]
async fn install_is_a_no_op_when_binary_exists() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let rt = RuntimeBuilder::new(VERSION)
        .installed(true)
        .build(Arc::new(runner.clone()));

    assert!(rt.runtime.is_installed());
    rt.runtime.install("0da89fac8e79", &EditorModule::defaults()).await?;
    rt.runtime.install("0da89fac8e79", &EditorModule::defaults()).await?;

    assert!(runner.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn install_runs_hub_with_version_changeset_and_modules() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let rt = RuntimeBuilder::new(VERSION).build(Arc::new(runner.clone()));

    rt.runtime
        .install("0da89fac8e79", &[EditorModule::Android, EditorModule::Ios])
        .await?;

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].raise_on_error);
    let inv = &calls[0].invocation;
    assert_eq!(inv.program(), "/usr/bin/unity-hub");
    assert_eq!(
        inv.arguments().collect::<Vec<_>>(),
        vec![
            "--headless",
            "install",
            "--version",
            VERSION,
            "--changeset",
            "0da89fac8e79",
            "--architecture",
            "x86_64",
            "--childModules",
            "--module",
            "android",
            "--module",
            "ios",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_install_surfaces_command_failed() {
    init_tracing();
    let runner = FakeRunner::new().exit_when("install", 4);
    let rt = RuntimeBuilder::new(VERSION).build(Arc::new(runner));

    let result = rt.runtime.install("0da89fac8e79", &[]).await;
    assert_eq!(result.unwrap_err().exit_code(), Some(4));
}

#[tokio::test]
async fn uninstall_is_a_no_op_when_absent() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let rt = RuntimeBuilder::new(VERSION).build(Arc::new(runner.clone()));

    assert!(!rt.runtime.is_installed());
    rt.runtime.uninstall().await?;

    assert!(runner.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn uninstall_removes_the_editor_directory() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let rt = RuntimeBuilder::new(VERSION)
        .installed(true)
        .build(Arc::new(runner.clone()));

    rt.runtime.uninstall().await?;

    let calls = runner.invocations();
    assert_eq!(calls.len(), 1);
    let editor_dir = rt.runtime.layout().editor_dir.to_string_lossy().to_string();
    assert_eq!(
        calls[0].raw_args(),
        vec!["rm", "-rf", editor_dir.as_str()]
    );
    Ok(())
}

#[tokio::test]
async fn run_test_with_coverage_builds_full_command() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let rt = RuntimeBuilder::new(VERSION).build(Arc::new(runner.clone()));
    let project = rt.paths().projects.join("2021");
    let run_id = RunId::new("2021", "linux", BuildTarget::Ios, TestPlatform::PlayMode)?;

    let code = rt
        .runtime
        .run_test(&run_id, &project, BuildTarget::Ios, TestPlatform::PlayMode, true)
        .await?;
    assert_eq!(code, 0);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let request = &calls[0];
    assert!(!request.raise_on_error);
    assert_eq!(
        request.log_path.as_deref(),
        Some(rt.paths().test_log_file("2021-linux-ios-playmode").as_path())
    );

    let inv = &request.invocation;
    assert_eq!(inv.program(), "xvfb-run");
    assert_eq!(inv.flag_value("-buildTarget"), Some("ios"));
    assert_eq!(inv.flag_value("-testPlatform"), Some("playmode"));
    assert_eq!(inv.flag_value("-projectPath"), project.to_str());
    assert!(
        inv.flag_value("-testResults")
            .unwrap()
            .ends_with("test-results/2021-linux-ios-playmode.xml")
    );
    assert!(inv.has_arg("-runTests"));
    assert!(inv.has_arg("-enableCodeCoverage"));
    assert!(inv.has_arg("-debugCodeOptimization"));
    assert!(
        inv.flag_value("-coverageResultsPath")
            .unwrap()
            .ends_with("coverage-results/2021-linux-ios-playmode")
    );
    let options = inv.flag_value("-coverageOptions").unwrap();
    assert!(options.starts_with("generateAdditionalMetrics;assemblyFilters:+Embrace,+Embrace.*;"));
    assert!(options.ends_with(&format!("pathStrippingPatterns:{}", rt.paths().base.display())));

    assert!(rt.paths().build.is_dir(), "build root is created before the run");
    Ok(())
}

#[tokio::test]
async fn run_test_without_coverage_omits_coverage_flags() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let rt = RuntimeBuilder::new(VERSION).build(Arc::new(runner.clone()));
    let project = rt.paths().projects.join("2021");
    let run_id = RunId::new("2021", "linux", BuildTarget::Android, TestPlatform::EditMode)?;

    rt.runtime
        .run_test(&run_id, &project, BuildTarget::Android, TestPlatform::EditMode, false)
        .await?;

    let inv = runner.invocations().remove(0);
    assert!(!inv.has_arg("-enableCodeCoverage"));
    assert!(inv.flag_value("-coverageOptions").is_none());
    Ok(())
}

#[tokio::test]
async fn failing_tests_return_exit_code_instead_of_error() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().exit_when("-runTests", 2);
    let rt = RuntimeBuilder::new(VERSION).build(Arc::new(runner));
    let project = rt.paths().projects.join("2021");
    let run_id = RunId::new("2021", "linux", BuildTarget::Android, TestPlatform::EditMode)?;

    let code = rt
        .runtime
        .run_test(&run_id, &project, BuildTarget::Android, TestPlatform::EditMode, false)
        .await?;

    assert_eq!(code, 2);
    Ok(())
}

#[tokio::test]
async fn configured_deadline_is_attached_to_test_runs() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let mut settings = test_settings(&[BuildTarget::Android]);
    settings.timeout = Some(Duration::from_secs(600));
    let rt = RuntimeBuilder::new(VERSION)
        .test_settings(settings)
        .build(Arc::new(runner.clone()));
    let project = rt.paths().projects.join("2021");
    let run_id = RunId::new("2021", "linux", BuildTarget::Android, TestPlatform::EditMode)?;

    rt.runtime
        .run_test(&run_id, &project, BuildTarget::Android, TestPlatform::EditMode, false)
        .await?;

    assert_eq!(
        runner.invocations()[0].deadline(),
        Some(Duration::from_secs(600))
    );
    Ok(())
}

#[tokio::test]
async fn export_package_moves_artifact_into_build_root() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let rt = RuntimeBuilder::new(VERSION).build(Arc::new(runner.clone()));

    let section = BuildSection::default();
    let manifest = rt.paths().resolve(&section.package_manifest);
    std::fs::create_dir_all(manifest.parent().unwrap())?;
    std::fs::write(&manifest, r#"{"name": "io.embrace.sdk", "version": "1.26.0"}"#)?;

    // The fake export leaves the artifact where the editor would.
    let produced = rt
        .paths()
        .projects
        .join(&section.project)
        .join("EmbraceSDK_1.26.0.unitypackage");
    std::fs::create_dir_all(produced.parent().unwrap())?;
    std::fs::write(&produced, b"package")?;

    let artifact = rt.runtime.export_package(&section).await?;

    assert_eq!(artifact, rt.paths().build.join("EmbraceSDK_1.26.0.unitypackage"));
    assert_eq!(std::fs::read(&artifact)?, b"package");
    assert!(!produced.exists());

    let request = runner.calls().remove(0);
    assert!(request.raise_on_error);
    assert_eq!(
        request.invocation.flag_value("-executeMethod"),
        Some(section.execute_method.as_str())
    );
    assert_eq!(request.log_path, Some(rt.paths().build_log_file()));
    Ok(())
}

#[tokio::test]
async fn export_package_requires_build_project() {
    init_tracing();
    let rt = RuntimeBuilder::new("2022.3.10f1")
        .with_project(false)
        .build(Arc::new(FakeRunner::new()));

    let section = BuildSection::default();
    let manifest = rt.paths().resolve(&section.package_manifest);
    std::fs::create_dir_all(manifest.parent().unwrap()).unwrap();
    std::fs::write(&manifest, r#"{"version": "1.0.0"}"#).unwrap();

    let result = rt.runtime.export_package(&section).await;
    assert!(
        matches!(result, Err(EditorCiError::ProjectNotFound(_))),
        "got {result:?}"
    );
}
