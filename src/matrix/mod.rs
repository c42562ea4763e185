// src/matrix/mod.rs

//! Build-target x test-platform matrix.
//!
//! - [`cell`] plans the cells and their run identifiers.
//! - [`executor`] runs them in order and collects a [`MatrixReport`].

pub mod cell;
pub mod executor;

pub use cell::{MatrixCell, RunId, plan_cells};
pub use executor::{CellOutcome, CellResult, MatrixReport, run_matrix};
