// src/matrix/executor.rs

//! Sequential execution of the test matrix.
//!
//! Cells run one at a time in plan order: the license and the editor
//! installation are machine-global. A failing cell (non-zero exit, or a run
//! that could not complete) is recorded and the next cell starts anyway.

use tracing::{Instrument, error, info, warn};

use crate::editor::EditorRuntime;
use crate::editor::project::{resolve_project_dir, version_year};
use crate::errors::Result;
use crate::matrix::cell::{MatrixCell, plan_cells};
use crate::types::BuildTarget;

/// How a single cell ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellResult {
    /// The test run finished with this exit code.
    Exited(i32),
    /// The test run could not complete (spawn failure, deadline, I/O).
    Errored(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutcome {
    pub cell: MatrixCell,
    pub result: CellResult,
}

impl CellOutcome {
    pub fn passed(&self) -> bool {
        self.result == CellResult::Exited(0)
    }
}

/// Per-cell outcomes, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixReport {
    pub outcomes: Vec<CellOutcome>,
}

impl MatrixReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(CellOutcome::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CellOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

/// Run every (build target, test platform) cell for the runtime's version.
///
/// Fails fast with `ProjectNotFound` before any cell runs if the project for
/// this version is missing; otherwise always returns a report with exactly
/// one outcome per planned cell.
pub async fn run_matrix(
    runtime: &EditorRuntime,
    build_targets: &[BuildTarget],
    coverage: bool,
) -> Result<MatrixReport> {
    let year = version_year(runtime.version());
    let project_path = resolve_project_dir(&runtime.paths().projects, runtime.version())?;
    let cells = plan_cells(year, runtime.layout().platform.key(), build_targets)?;

    let report = async {
        info!(cells = cells.len(), coverage, "running tests for {year}");

        let mut report = MatrixReport::default();
        for cell in cells {
            let result = match runtime
                .run_test(
                    &cell.run_id,
                    &project_path,
                    cell.build_target,
                    cell.test_platform,
                    coverage,
                )
                .await
            {
                Ok(code) => CellResult::Exited(code),
                Err(e) => {
                    error!(run_id = %cell.run_id, error = %e, "test run did not complete");
                    CellResult::Errored(e.to_string())
                }
            };
            report.outcomes.push(CellOutcome { cell, result });
        }

        let failed = report.failed().count();
        if failed == 0 {
            info!(cells = report.outcomes.len(), "all test cells passed");
        } else {
            for outcome in report.failed() {
                warn!(run_id = %outcome.cell.run_id, result = ?outcome.result, "test cell failed");
            }
            warn!(failed, cells = report.outcomes.len(), "some test cells failed");
        }
        report
    }
    .instrument(runtime.span().clone())
    .await;

    Ok(report)
}
