// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model and the validated `Config`.
//! - `loader.rs`: reading a config file (or falling back to defaults).
//! - `validate.rs`: semantic checks and path resolution.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    BuildSection, Config, InstallSection, LicenseSettings, RawConfig, TestSettings,
    WorkspacePaths,
};
pub use validate::timeout_from_minutes;
