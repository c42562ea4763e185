// src/matrix/cell.rs

use std::collections::HashSet;
use std::fmt;

use tracing::warn;

use crate::errors::{EditorCiError, Result};
use crate::types::{BuildTarget, TestPlatform};

const RUN_ID_DELIMITER: &str = "-";

/// Filesystem-safe key naming one cell's artifacts (logs, results, coverage).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// `<year>-<platform>-<build_target>-<test_platform>`.
    pub fn new(
        year: &str,
        platform_key: &str,
        build_target: BuildTarget,
        test_platform: TestPlatform,
    ) -> Result<Self> {
        for part in [year, platform_key] {
            if part.is_empty() || !part.chars().all(is_safe_component_char) {
                return Err(EditorCiError::InvalidRunIdentifier(format!(
                    "component {part:?} must be non-empty and contain only [A-Za-z0-9._]"
                )));
            }
        }
        let id = [
            year,
            platform_key,
            build_target.as_str(),
            test_platform.as_str(),
        ]
        .join(RUN_ID_DELIMITER);
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Components may not contain the delimiter, which keeps ids collision-free.
fn is_safe_component_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_'
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One (build target, test platform) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCell {
    pub build_target: BuildTarget,
    pub test_platform: TestPlatform,
    pub run_id: RunId,
}

/// Expand the matrix in execution order: targets as given, and for each
/// target edit mode before play mode.
///
/// Repeated build targets are dropped so every run id stays unique.
pub fn plan_cells(
    year: &str,
    platform_key: &str,
    build_targets: &[BuildTarget],
) -> Result<Vec<MatrixCell>> {
    if build_targets.is_empty() {
        return Err(EditorCiError::Config(
            "at least one build target is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut cells = Vec::with_capacity(build_targets.len() * TestPlatform::ALL.len());
    for &build_target in build_targets {
        if !seen.insert(build_target) {
            warn!(%build_target, "build target listed more than once; ignoring repeat");
            continue;
        }
        for test_platform in TestPlatform::ALL {
            cells.push(MatrixCell {
                build_target,
                test_platform,
                run_id: RunId::new(year, platform_key, build_target, test_platform)?,
            });
        }
    }
    Ok(cells)
}
