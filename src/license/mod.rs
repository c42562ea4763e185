// src/license/mod.rs

//! License handling.
//!
//! - [`credential`]: the serial/username/password triple from the environment.
//! - [`annotate`]: the CI channel used to mask the serial.
//! - [`lease`]: activate-then-always-return scope around licensed work.

pub mod annotate;
pub mod credential;
pub mod lease;

pub use annotate::{CiAnnotator, GithubAnnotator};
pub use credential::LicenseCredential;
pub use lease::LicenseLease;
