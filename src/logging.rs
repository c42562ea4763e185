// src/logging.rs

//! Logging setup for `editor-ci` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--quiet` (info)
//! 3. `EDITOR_CI_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `debug`, so filtered child-process output is shown
//!
//! Logs go to STDERR with ANSI colors per level; stdout is reserved for CI
//! annotations and command output such as `platform`.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "EDITOR_CI_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, quiet: bool) -> Result<()> {
    let level = resolve_level(cli_level, quiet, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(())
}

fn resolve_level(cli_level: Option<LogLevel>, quiet: bool, env: Option<&str>) -> Level {
    match (cli_level, quiet) {
        (Some(lvl), _) => lvl.into(),
        (None, true) => Level::INFO,
        // Unparseable values fall back to the default instead of failing startup.
        (None, false) => env
            .and_then(|v| v.trim().parse::<Level>().ok())
            .unwrap_or(Level::DEBUG),
    }
}

impl From<LogLevel> for Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_quiet_and_env() {
        assert_eq!(resolve_level(Some(LogLevel::Warn), true, Some("trace")), Level::WARN);
    }

    #[test]
    fn quiet_beats_env() {
        assert_eq!(resolve_level(None, true, Some("trace")), Level::INFO);
    }

    #[test]
    fn env_then_debug_default() {
        assert_eq!(resolve_level(None, false, Some(" Warn ")), Level::WARN);
        assert_eq!(resolve_level(None, false, Some("loud")), Level::DEBUG);
        assert_eq!(resolve_level(None, false, None), Level::DEBUG);
    }
}
