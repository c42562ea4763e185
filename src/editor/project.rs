// src/editor/project.rs

//! Project-level metadata read from disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{EditorCiError, Result};

static EDITOR_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"m_EditorVersionWithRevision: ([^ ]+) \(([^\)]+)\)")
        .expect("editor version pattern is valid")
});

/// Editor version and changeset a project was last saved with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectEditorVersion {
    pub project: String,
    pub version: String,
    pub changeset: String,
}

/// Read `ProjectSettings/ProjectVersion.txt` of the project at `project_dir`.
pub fn read_editor_version(project: &str, project_dir: &Path) -> Result<ProjectEditorVersion> {
    let file = project_dir.join("ProjectSettings").join("ProjectVersion.txt");
    let contents = fs::read_to_string(&file)?;
    parse_editor_version(&contents)
        .map(|(version, changeset)| ProjectEditorVersion {
            project: project.to_string(),
            version,
            changeset,
        })
        .ok_or_else(|| {
            EditorCiError::Config(format!("unable to find editor version in {}", file.display()))
        })
}

fn parse_editor_version(contents: &str) -> Option<(String, String)> {
    contents.lines().find_map(|line| {
        EDITOR_VERSION_RE
            .captures(line.trim())
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
    })
}

/// Project directory name for an editor version: its major ("year") component.
pub fn version_year(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Directory of the project matching `version`; `ProjectNotFound` if absent.
pub fn resolve_project_dir(projects_root: &Path, version: &str) -> Result<PathBuf> {
    let dir = projects_root.join(version_year(version));
    if !dir.exists() {
        return Err(EditorCiError::ProjectNotFound(dir));
    }
    Ok(dir)
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    version: String,
}

/// Version field of a `package.json` style manifest.
pub fn read_package_version(manifest: &Path) -> Result<String> {
    let contents = fs::read_to_string(manifest)?;
    let parsed: PackageManifest = serde_json::from_str(&contents)?;
    Ok(parsed.version)
}

/// Empty project used for one-off editor commands such as license activation.
///
/// Created on demand under the system temp dir.
pub fn scratch_project_dir() -> Result<PathBuf> {
    scratch_project_dir_in(&std::env::temp_dir())
}

pub fn scratch_project_dir_in(parent: &Path) -> Result<PathBuf> {
    let dir = parent.join("dummy-project");
    fs::create_dir_all(dir.join("Assets"))?;
    Ok(dir)
}
