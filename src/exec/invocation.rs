// src/exec/invocation.rs

//! External command invocations.
//!
//! A [`CommandInvocation`] is an ordered list of arguments plus an optional
//! working directory, environment overrides and deadline. Arguments that carry
//! credentials are stored as [`Arg::Secret`] so that every rendering of the
//! invocation (log lines, error messages) stays masked, while the real value
//! is still passed to the child process.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of trailing characters of a masked secret that stay visible.
pub const VISIBLE_SECRET_SUFFIX: usize = 4;

/// One argument of a command line.
#[derive(Clone, PartialEq, Eq)]
pub enum Arg {
    Plain(String),
    /// Rendered with all but the last `visible_suffix` characters masked.
    Secret { value: String, visible_suffix: usize },
}

impl Arg {
    /// The value handed to the child process.
    pub fn value(&self) -> &str {
        match self {
            Arg::Plain(v) => v,
            Arg::Secret { value, .. } => value,
        }
    }

    /// The value as it may appear in logs.
    pub fn redacted(&self) -> String {
        match self {
            Arg::Plain(v) => v.clone(),
            Arg::Secret {
                value,
                visible_suffix,
            } => mask_secret(value, *visible_suffix),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.redacted())
    }
}

/// Mask every character of `secret` except the last `visible_suffix` ones.
///
/// Secrets no longer than the visible suffix are masked completely.
pub fn mask_secret(secret: &str, visible_suffix: usize) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= visible_suffix {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - visible_suffix;
    let mut out = "*".repeat(hidden);
    out.extend(&chars[hidden..]);
    out
}

/// An external process invocation. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInvocation {
    args: Vec<Arg>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    timeout: Option<Duration>,
}

impl CommandInvocation {
    /// Start an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            args: vec![Arg::Plain(program.into())],
            cwd: None,
            env: Vec::new(),
            timeout: None,
        }
    }

    /// Build an invocation from a prefix such as `["xvfb-run", "--auto-servernum", "/opt/.../Unity"]`.
    ///
    /// Returns `None` for an empty prefix.
    pub fn from_prefix<I, S>(prefix: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = prefix.into_iter();
        let mut inv = CommandInvocation::new(iter.next()?);
        for a in iter {
            inv = inv.arg(a);
        }
        Some(inv)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Add a credential argument that keeps its last four characters visible.
    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg::Secret {
            value: value.into(),
            visible_suffix: VISIBLE_SECRET_SUFFIX,
        });
        self
    }

    /// Add a credential argument that is masked entirely.
    pub fn hidden_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg::Secret {
            value: value.into(),
            visible_suffix: 0,
        });
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Deadline after which the child is killed.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        self.args[0].value()
    }

    /// Arguments after the program, as passed to the child.
    pub fn arguments(&self) -> impl Iterator<Item = &str> {
        self.args[1..].iter().map(Arg::value)
    }

    /// All arguments including the program, unmasked.
    pub fn raw_args(&self) -> Vec<&str> {
        self.args.iter().map(Arg::value).collect()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_overrides(&self) -> &[(OsString, OsString)] {
        &self.env
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timeout
    }

    /// True if any argument equals `needle` exactly.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a.value() == needle)
    }

    /// Value following the flag `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .windows(2)
            .find(|w| w[0].value() == flag)
            .map(|w| w[1].value())
    }
}

impl fmt::Display for CommandInvocation {
    /// Masked, shell-like rendering used for logs and errors.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            let shown = arg.redacted();
            if shown.is_empty() || shown.contains(char::is_whitespace) {
                write!(f, "'{shown}'")?;
            } else {
                f.write_str(&shown)?;
            }
        }
        Ok(())
    }
}
