// src/editor/mod.rs

//! The editor toolchain on this machine.
//!
//! - [`platform`] resolves host-specific paths and launch rules once.
//! - [`project`] reads project metadata (editor version, package version).
//! - [`runtime`] installs/uninstalls the editor and runs single test cells
//!   and package exports.

pub mod platform;
pub mod project;
pub mod runtime;

pub use platform::{Architecture, HostPlatform, PlatformLayout};
pub use project::ProjectEditorVersion;
pub use runtime::EditorRuntime;
