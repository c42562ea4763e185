// src/editor/platform.rs

//! Host platform specifics, resolved once at startup.
//!
//! Nothing outside this module branches on the operating system: callers ask
//! the [`PlatformLayout`] for paths and ready-made invocations.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{EditorCiError, Result};
use crate::exec::CommandInvocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Darwin,
    Linux,
    Windows,
}

impl HostPlatform {
    /// Platform of the running host.
    pub fn detect() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value.
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "macos" => Ok(HostPlatform::Darwin),
            "linux" => Ok(HostPlatform::Linux),
            "windows" => Ok(HostPlatform::Windows),
            other => Err(EditorCiError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Short key used in run identifiers and by the `platform` subcommand.
    pub fn key(self) -> &'static str {
        match self {
            HostPlatform::Darwin => "darwin",
            HostPlatform::Linux => "linux",
            HostPlatform::Windows => "win32",
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Editor architecture passed to the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
    Arm64,
}

impl Architecture {
    /// Only macOS hosts install arm64 editors; everything else gets x86_64.
    pub fn for_host(platform: HostPlatform, machine: &str) -> Self {
        match (platform, machine) {
            (HostPlatform::Darwin, "aarch64" | "arm64") => Architecture::Arm64,
            _ => Architecture::X86_64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm64",
        }
    }
}

const DARWIN_EDITORS: &str = "/Applications/Unity/Hub/Editor";
const DARWIN_HUB: &str = "/Applications/Unity Hub.app/Contents/MacOS/Unity Hub";
const DARWIN_LICENSE_DIR: &str = "/Library/Application Support/Unity";
const LINUX_EDITORS: &str = "/opt/unity/editors";
const LINUX_HUB: &str = "/usr/bin/unity-hub";
const WINDOWS_EDITORS: &str = r"C:\Program Files\Unity\Hub\Editor";
const WINDOWS_HUB: &str = r"C:\Program Files\Unity Hub\Unity Hub.exe";

/// Concrete paths and launch rules for one host platform and editor version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformLayout {
    pub platform: HostPlatform,
    pub architecture: Architecture,
    /// Installation directory of this editor version.
    pub editor_dir: PathBuf,
    /// The editor binary; its existence defines "installed".
    pub editor_binary: PathBuf,
    /// Shared license directory that must be world-writable before activation.
    pub license_dir: Option<PathBuf>,
}

impl PlatformLayout {
    /// Standard layout for the running host.
    pub fn detect(version: &str) -> Result<Self> {
        let platform = HostPlatform::detect()?;
        let architecture = Architecture::for_host(platform, std::env::consts::ARCH);
        Ok(Self::standard(platform, architecture, version))
    }

    /// Standard layout for `platform`, independent of the running host.
    pub fn standard(platform: HostPlatform, architecture: Architecture, version: &str) -> Self {
        let editors_root = match platform {
            HostPlatform::Darwin => DARWIN_EDITORS,
            HostPlatform::Linux => LINUX_EDITORS,
            HostPlatform::Windows => WINDOWS_EDITORS,
        };
        let mut layout = Self::under_root(platform, architecture, Path::new(editors_root), version);
        if platform == HostPlatform::Darwin {
            layout.license_dir = Some(PathBuf::from(DARWIN_LICENSE_DIR));
        }
        layout
    }

    /// Layout with editors installed under `editors_root` (used by tests and
    /// custom installs). No shared license directory is configured.
    pub fn under_root(
        platform: HostPlatform,
        architecture: Architecture,
        editors_root: &Path,
        version: &str,
    ) -> Self {
        let editor_dir = editors_root.join(version);
        let editor_binary = match platform {
            HostPlatform::Darwin => editor_dir.join("Unity.app/Contents/MacOS/Unity"),
            HostPlatform::Linux => editor_dir.join("Editor").join("Unity"),
            HostPlatform::Windows => editor_dir.join("Editor").join("Unity.exe"),
        };
        Self {
            platform,
            architecture,
            editor_dir,
            editor_binary,
            license_dir: None,
        }
    }

    /// Invocation prefix that launches the editor.
    ///
    /// Linux runners have no display, so the editor runs under `xvfb-run`.
    pub fn editor_command(&self) -> CommandInvocation {
        match self.platform {
            HostPlatform::Linux => CommandInvocation::new("xvfb-run")
                .arg("--auto-servernum")
                .path_arg(&self.editor_binary),
            HostPlatform::Darwin | HostPlatform::Windows => {
                CommandInvocation::new(self.editor_binary.to_string_lossy())
            }
        }
    }

    /// Invocation of the headless hub CLI with `hub_args`.
    pub fn hub_command(&self, hub_args: &[String]) -> CommandInvocation {
        match self.platform {
            HostPlatform::Darwin => CommandInvocation::new(DARWIN_HUB)
                .arg("--")
                .args(hub_args.iter().cloned()),
            HostPlatform::Linux => CommandInvocation::new(LINUX_HUB).args(hub_args.iter().cloned()),
            HostPlatform::Windows => {
                let argument_list = std::iter::once("--")
                    .chain(hub_args.iter().map(String::as_str))
                    .map(|v| format!("'{v}'"))
                    .collect::<Vec<_>>()
                    .join(",");
                CommandInvocation::new("powershell.exe")
                    .args(["-ExecutionPolicy", "Bypass", "-Command", "Start-Process"])
                    .arg("-FilePath")
                    .arg(format!("'{WINDOWS_HUB}'"))
                    .arg("-ArgumentList")
                    .arg(argument_list)
                    .args(["-Wait", "-PassThru"])
            }
        }
    }

    /// Invocation that deletes `dir` recursively.
    pub fn remove_tree_command(&self, dir: &Path) -> CommandInvocation {
        match self.platform {
            HostPlatform::Windows => CommandInvocation::new("powershell.exe")
                .args(["-Command", "Remove-Item", "-Recurse", "-Force"])
                .arg(format!("'{}'", dir.display())),
            HostPlatform::Darwin | HostPlatform::Linux => {
                CommandInvocation::new("rm").arg("-rf").path_arg(dir)
            }
        }
    }

    /// Idempotent commands that make the shared license directory writable by
    /// all users. Empty when the platform has no such directory.
    pub fn license_dir_repair_commands(&self) -> Vec<CommandInvocation> {
        let Some(dir) = &self.license_dir else {
            return Vec::new();
        };
        vec![
            CommandInvocation::new("sudo").args(["mkdir", "-p"]).path_arg(dir),
            CommandInvocation::new("sudo")
                .args(["chmod", "-R", "u=rwx,g=rwx,o=rwx"])
                .path_arg(dir),
        ]
    }
}
