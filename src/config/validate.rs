// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{
    Config, LicenseSettings, RawConfig, TestSettings, WorkspacePaths,
};
use crate::errors::{EditorCiError, Result};
use crate::exec::RetryPolicy;

impl TryFrom<RawConfig> for Config {
    type Error = EditorCiError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let paths = resolve_paths(&raw)?;
        let timeout = raw.test.timeout_minutes.map(timeout_from_minutes).transpose()?;
        let retry = RetryPolicy::new(
            raw.license.max_attempts,
            Duration::from_secs(raw.license.delay_seconds),
        )?;

        Ok(Config {
            paths,
            license: LicenseSettings {
                retry,
                marker: raw.license.marker,
            },
            test: TestSettings {
                marker: raw.test.marker,
                build_targets: raw.test.build_targets,
                assembly_filters: raw.test.assembly_filters,
                timeout,
            },
            build: raw.build,
            install: raw.install,
        })
    }
}

/// Per-cell deadline for `minutes`; zero and overflowing values are rejected.
pub fn timeout_from_minutes(minutes: u64) -> Result<Duration> {
    if minutes == 0 {
        return Err(EditorCiError::Config(
            "[test].timeout_minutes must be >= 1 when set (got 0)".to_string(),
        ));
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            EditorCiError::Config(format!("[test].timeout_minutes is too large (got {minutes})"))
        })
}

fn validate_raw_config(cfg: &RawConfig) -> Result<()> {
    validate_license(cfg)?;
    validate_test(cfg)?;
    validate_build(cfg)?;
    Ok(())
}

fn validate_license(cfg: &RawConfig) -> Result<()> {
    if cfg.license.max_attempts == 0 {
        return Err(EditorCiError::Config(
            "[license].max_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.license.marker.trim().is_empty() {
        return Err(EditorCiError::Config(
            "[license].marker must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_test(cfg: &RawConfig) -> Result<()> {
    if cfg.test.marker.trim().is_empty() {
        return Err(EditorCiError::Config(
            "[test].marker must not be empty".to_string(),
        ));
    }
    if cfg.test.build_targets.is_empty() {
        return Err(EditorCiError::Config(
            "[test].build_targets must list at least one target".to_string(),
        ));
    }
    if let Some(minutes) = cfg.test.timeout_minutes {
        timeout_from_minutes(minutes)?;
    }
    Ok(())
}

fn validate_build(cfg: &RawConfig) -> Result<()> {
    if cfg.build.execute_method.trim().is_empty() {
        return Err(EditorCiError::Config(
            "[build].execute_method must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Absolute checkout root plus `build`/`projects` resolved against it.
fn resolve_paths(cfg: &RawConfig) -> Result<WorkspacePaths> {
    let base = cfg.paths.base.clone().unwrap_or_else(|| PathBuf::from("."));
    let base = std::path::absolute(&base)?;
    let mut paths = WorkspacePaths::under(&base);
    if let Some(build) = &cfg.paths.build {
        paths.build = join_relative(&base, build);
    }
    if let Some(projects) = &cfg.paths.projects {
        paths.projects = join_relative(&base, projects);
    }
    Ok(paths)
}

fn join_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuildTarget;

    #[test]
    fn defaults_validate() {
        let cfg = Config::try_from(RawConfig::default()).unwrap();
        assert_eq!(cfg.license.retry, RetryPolicy::default());
        assert_eq!(cfg.license.marker, "[Licensing::Client]");
        assert_eq!(cfg.test.marker, "[Test Profiler]");
        assert_eq!(
            cfg.test.build_targets,
            vec![BuildTarget::Android, BuildTarget::Ios]
        );
        assert!(cfg.paths.base.is_absolute());
        assert_eq!(cfg.paths.build, cfg.paths.base.join("build"));
        assert_eq!(cfg.test.timeout, None);
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut raw = RawConfig::default();
        raw.license.max_attempts = 0;
        match Config::try_from(raw) {
            Err(EditorCiError::Config(msg)) => assert!(msg.contains("max_attempts")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_build_targets_rejected() {
        let mut raw = RawConfig::default();
        raw.test.build_targets.clear();
        assert!(matches!(
            Config::try_from(raw),
            Err(EditorCiError::Config(_))
        ));
    }

    #[test]
    fn timeout_minutes_become_duration() {
        let mut raw = RawConfig::default();
        raw.test.timeout_minutes = Some(90);
        let cfg = Config::try_from(raw).unwrap();
        assert_eq!(cfg.test.timeout, Some(Duration::from_secs(90 * 60)));
    }

    #[test]
    fn overflowing_timeout_minutes_rejected() {
        let mut raw = RawConfig::default();
        raw.test.timeout_minutes = Some(u64::MAX / 10);
        match Config::try_from(raw) {
            Err(EditorCiError::Config(msg)) => assert!(msg.contains("timeout_minutes")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn timeout_from_minutes_bounds() {
        assert!(timeout_from_minutes(0).is_err());
        assert!(timeout_from_minutes(u64::MAX).is_err());
        assert_eq!(
            timeout_from_minutes(u64::MAX / 60).unwrap(),
            Duration::from_secs((u64::MAX / 60) * 60)
        );
    }

    #[test]
    fn absolute_build_path_is_kept() {
        let mut raw = RawConfig::default();
        raw.paths.base = Some(PathBuf::from("/work/checkout"));
        raw.paths.build = Some(PathBuf::from("/tmp/out"));
        raw.paths.projects = Some(PathBuf::from("projects"));
        let cfg = Config::try_from(raw).unwrap();
        assert_eq!(cfg.paths.build, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.paths.projects, PathBuf::from("/work/checkout/projects"));
    }
}
