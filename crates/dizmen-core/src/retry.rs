//! # Retry
//!
//! Bounded retry with exponential backoff for storage writes that may fail
//! transiently (draft saves). Only errors for which
//! [`DizmenError::is_transient`] holds are retried.

use crate::DizmenError;
use crate::primitives::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS, MAX_RETRY_BACKOFF_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Something that can wait. Injected so tests do not sleep.
pub trait Sleeper: Send + Sync + fmt::Debug {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. `0` behaves like `1`.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Cap for any single delay.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            initial_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            max_backoff_ms: MAX_RETRY_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay before retry number `retry` (0-based): `initial * 2^retry`, capped.
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.min(32);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Run `op`, retrying transient failures until attempts run out.
    pub fn run<T>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: impl FnMut() -> Result<T, DizmenError>,
    ) -> Result<T, DizmenError> {
        let attempts = self.max_attempts.max(1);
        let mut retry = 0;
        loop {
            match op() {
                Err(e) if e.is_transient() && retry + 1 < attempts => {
                    sleeper.sleep(self.backoff_for(retry));
                    retry += 1;
                }
                result => return result,
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
