// src/license/annotate.rs

//! CI annotation channel.
//!
//! Values registered through [`CiAnnotator::add_mask`] are replaced by the CI
//! system in every later log line, including the child-process output it
//! captures from our stdout/stderr.

use std::io::{self, Write};

use tracing::warn;

pub trait CiAnnotator: Send + Sync {
    fn add_mask(&self, value: &str);
}

/// GitHub Actions workflow commands written to stdout.
#[derive(Debug, Clone, Default)]
pub struct GithubAnnotator;

impl CiAnnotator for GithubAnnotator {
    fn add_mask(&self, value: &str) {
        if let Err(e) = write_mask(&mut std::io::stdout().lock(), value) {
            warn!(error = %e, "failed to register secret mask; later output may leak it");
        }
    }
}

fn write_mask<W: Write>(out: &mut W, value: &str) -> io::Result<()> {
    writeln!(out, "::add-mask::{value}")?;
    out.flush()
}
