use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Deployment platform variant that tests are compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    Android,
    Ios,
}

impl BuildTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildTarget::Android => "android",
            BuildTarget::Ios => "ios",
        }
    }

    /// Targets used when none are requested explicitly.
    pub fn defaults() -> Vec<BuildTarget> {
        vec![BuildTarget::Android, BuildTarget::Ios]
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "android" => Ok(BuildTarget::Android),
            "ios" => Ok(BuildTarget::Ios),
            other => Err(format!(
                "invalid build target: {other} (expected \"android\" or \"ios\")"
            )),
        }
    }
}

/// In-process test mode, orthogonal to [`BuildTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestPlatform {
    EditMode,
    PlayMode,
}

impl TestPlatform {
    /// Fixed execution order: edit mode first, then play mode.
    pub const ALL: [TestPlatform; 2] = [TestPlatform::EditMode, TestPlatform::PlayMode];

    pub fn as_str(self) -> &'static str {
        match self {
            TestPlatform::EditMode => "editmode",
            TestPlatform::PlayMode => "playmode",
        }
    }
}

impl fmt::Display for TestPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editor module requested at install time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EditorModule {
    Android,
    Ios,
}

impl EditorModule {
    pub fn as_str(self) -> &'static str {
        match self {
            EditorModule::Android => "android",
            EditorModule::Ios => "ios",
        }
    }

    pub fn defaults() -> Vec<EditorModule> {
        vec![EditorModule::Android, EditorModule::Ios]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_target_parses_case_insensitively() {
        assert_eq!("Android".parse::<BuildTarget>(), Ok(BuildTarget::Android));
        assert_eq!(" ios ".parse::<BuildTarget>(), Ok(BuildTarget::Ios));
        assert!("webgl".parse::<BuildTarget>().is_err());
    }

    #[test]
    fn test_platforms_run_editmode_first() {
        let names: Vec<_> = TestPlatform::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["editmode", "playmode"]);
    }
}
