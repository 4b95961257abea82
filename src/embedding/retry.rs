// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy for remote embedding calls.
//!
//! Retries are confined to the embedding request: persistence writes and
//! lookups are never retried here. Only errors classified transient by
//! `MemoryError::is_transient` trigger another attempt.

use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;
use crate::errors::Result;

/// Exponential backoff: `base * factor^(attempt-1)`, capped.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base: Duration::from_secs(4),
            factor: 2,
            cap: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts(),
            base: Duration::from_secs(config.base_secs()),
            factor: 2,
            cap: Duration::from_secs(config.cap_secs()),
        }
    }

    /// Delay to sleep after a failed attempt (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base
            .saturating_mul(self.factor.saturating_pow(attempt.saturating_sub(1)));
        exp.min(self.cap)
    }

    /// Runs `op`, retrying transient failures up to `attempts` times total.
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient embedding failure, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MemoryError;
    use std::cell::Cell;

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base: Duration::from_millis(1),
            factor: 2,
            cap: Duration::from_millis(4),
        }
    }

    #[test]
    fn delay_sequence_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        // 16s uncapped, clamped to 10s.
        assert_eq!(policy.delay_for(3), Duration::from_secs(10));
    }

    #[test]
    fn transient_errors_are_retried() {
        let calls = Cell::new(0u32);
        let result: Result<()> = fast_policy(3).run(|| {
            calls.set(calls.get() + 1);
            Err(MemoryError::Timeout { seconds: 30 })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn non_transient_errors_fail_immediately() {
        let calls = Cell::new(0u32);
        let result: Result<()> = fast_policy(3).run(|| {
            calls.set(calls.get() + 1);
            Err(MemoryError::MissingCredential {
                env_var: "KEY".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn success_after_transient_failure() {
        let calls = Cell::new(0u32);
        let result = fast_policy(3).run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(MemoryError::RemoteService {
                    status: 503,
                    body: "unavailable".into(),
                })
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 2);
    }
}
