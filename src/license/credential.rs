// src/license/credential.rs

use std::fmt;

use crate::errors::{EditorCiError, Result};
use crate::exec::invocation::{VISIBLE_SECRET_SUFFIX, mask_secret};

pub const SERIAL_VAR: &str = "UNITY_SERIAL";
pub const USERNAME_VAR: &str = "UNITY_EMAIL";
pub const PASSWORD_VAR: &str = "UNITY_PASSWORD";

/// License serial plus account credentials. Read once, never logged in full.
#[derive(Clone, PartialEq, Eq)]
pub struct LicenseCredential {
    serial: String,
    username: String,
    password: String,
}

impl LicenseCredential {
    pub fn new(
        serial: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read the credential from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the credential through `lookup`; empty values count as missing.
    ///
    /// All missing variables are reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut fetch = |key: &'static str| match lookup(key) {
            Some(v) if !v.is_empty() => v,
            _ => {
                missing.push(key);
                String::new()
            }
        };
        let serial = fetch(SERIAL_VAR);
        let username = fetch(USERNAME_VAR);
        let password = fetch(PASSWORD_VAR);

        if !missing.is_empty() {
            return Err(EditorCiError::MissingCredentials(missing));
        }
        Ok(Self::new(serial, username, password))
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Serial with everything but the last four characters masked.
    pub fn masked_serial(&self) -> String {
        mask_secret(&self.serial, VISIBLE_SECRET_SUFFIX)
    }

    /// The part of the serial that must never be shown: all but its last four
    /// characters. `None` if the serial is too short to have a hidden part.
    pub fn hidden_serial_prefix(&self) -> Option<&str> {
        let visible = self.serial.chars().rev().take(VISIBLE_SECRET_SUFFIX);
        let visible_len: usize = visible.map(char::len_utf8).sum();
        let cut = self.serial.len() - visible_len;
        (cut > 0).then(|| &self.serial[..cut])
    }
}

impl fmt::Debug for LicenseCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseCredential")
            .field("serial", &self.masked_serial())
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}
