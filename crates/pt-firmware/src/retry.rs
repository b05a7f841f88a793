//! Bounded retry with doubling backoff for flaky peripherals.

use crate::error::{FirmwareError, FirmwareResult};
use std::time::Duration;
use tracing::warn;

/// How many times to attempt a device operation and how long to wait
/// between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1).
    pub attempts: u32,
    /// Sleep before the second attempt; doubles on each further attempt.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, initial_backoff: Duration) -> FirmwareResult<Self> {
        if attempts == 0 {
            return Err(FirmwareError::InvalidArg {
                what: "retry attempts must be at least 1",
            });
        }
        Ok(Self {
            attempts,
            initial_backoff,
        })
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds or attempts are exhausted.
    ///
    /// Returns the first success, or the error from the final attempt.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> FirmwareResult<T>,
    ) -> FirmwareResult<T> {
        let mut backoff = self.initial_backoff;
        let mut last_err = FirmwareError::InvalidArg {
            what: "retry attempts must be at least 1",
        };
        for attempt in 1..=self.attempts.max(1) {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt < self.attempts {
                        warn!(what, attempt, error = %e, "device operation failed, retrying");
                        if !backoff.is_zero() {
                            std::thread::sleep(backoff);
                        }
                        backoff *= 2;
                    }
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
