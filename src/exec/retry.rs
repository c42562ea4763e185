// src/exec/retry.rs

//! Bounded retry with a fixed delay between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::errors::{EditorCiError, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(EditorCiError::Config(
                "retry max_attempts must be >= 1 (got 0)".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// Sleeps `delay` between attempts, never after the last one. The error
    /// of the final attempt is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut operation: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            info!(attempt, "{what} (attempt {attempt})");
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    error!(attempt, error = %err, "{what} failed (attempt {attempt})");
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    info!("retrying in {} seconds...", self.delay.as_secs());
                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
