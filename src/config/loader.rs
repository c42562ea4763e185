// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{Config, RawConfig};
use crate::errors::Result;

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "EditorCi.toml";

/// Load a config file and return the raw `RawConfig`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for the
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a config file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config = load_from_path(&path)?;
    let config = Config::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for a run.
///
/// - An explicitly named file must exist.
/// - Without one, `EditorCi.toml` is used if present, otherwise defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let path = default_config_path();
            if path.exists() {
                load_and_validate(&path)
            } else {
                debug!(path = %path.display(), "no config file found; using defaults");
                Config::try_from(RawConfig::default())
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
