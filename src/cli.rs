// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{BuildTarget, EditorModule};

/// Command-line arguments for `editor-ci`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "editor-ci",
    version,
    about = "Install the editor, lease its license and run the test matrix in CI.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `EditorCi.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log at info level and above.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Overrides `--quiet` and `EDITOR_CI_LOG`.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Install the editor (no-op if already installed).
    Install(InstallArgs),
    /// Remove the editor (no-op if not installed).
    Uninstall(EditorArgs),
    /// Export the package from the build project.
    Build(BuildArgs),
    /// Run the build-target x test-platform matrix.
    Test(TestArgs),
    /// Print the editor version and changeset recorded by projects.
    EditorVersion(EditorVersionArgs),
    /// Print the host platform key.
    Platform,
}

#[derive(Debug, Clone, Args)]
pub struct EditorArgs {
    /// Editor version, e.g. `2021.3.45f1`.
    #[arg(long, value_name = "VERSION")]
    pub editor: String,
}

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub editor: EditorArgs,

    /// Changeset of the version. Defaults to the one recorded by the project.
    #[arg(long)]
    pub changeset: Option<String>,

    /// Modules to install (repeatable). Defaults to `[install].modules`.
    #[arg(long = "module", value_enum)]
    pub modules: Vec<EditorModule>,
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub editor: EditorArgs,

    /// Skip activating the license.
    #[arg(long)]
    pub skip_license: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TestArgs {
    #[command(flatten)]
    pub editor: EditorArgs,

    /// Skip generating code coverage results.
    #[arg(long)]
    pub skip_coverage: bool,

    /// Skip activating the license.
    #[arg(long)]
    pub skip_license: bool,

    /// Build targets to run tests for (repeatable). Defaults to `[test].build_targets`.
    #[arg(long = "build-target", value_enum)]
    pub build_targets: Vec<BuildTarget>,

    /// Kill a test run that takes longer than this.
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_minutes: Option<u64>,

    /// Exit 0 even if some test cells failed.
    #[arg(long)]
    pub allow_test_failures: bool,
}

#[derive(Debug, Clone, Args)]
pub struct EditorVersionArgs {
    /// Project directories to inspect (repeatable). Defaults to `2021` and `2022`.
    #[arg(long = "project")]
    pub projects: Vec<String>,

    /// Print only this field, one line per project.
    #[arg(long, value_enum)]
    pub field: Option<VersionField>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum VersionField {
    Project,
    Version,
    Changeset,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
