//! Bounded retry with linear backoff
//!
//! `RetryExecutor` runs a fallible async operation up to a fixed number of
//! attempts, sleeping `base * n` after the n-th failure. It never raises:
//! the caller receives a tagged `RetryResult` and decides what exhaustion
//! means.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one; at least 1
    pub max_attempts: u32,

    /// Linear backoff base
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// A zero attempt budget is raised to one
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Fresh backoff schedule for one operation
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.backoff_base, self.max_attempts)
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_attempts: {}, backoff_base: {:?} }}",
            self.max_attempts, self.backoff_base
        )
    }
}

/// Linear backoff schedule: base, 2*base, 3*base, ... then exhausted
///
/// Yields `max_attempts - 1` delays, one per retry.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    max_attempts: u32,
    failed: u32,
}

impl LinearBackoff {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts: max_attempts.max(1),
            failed: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.failed = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.failed = self.failed.saturating_add(1);
        if self.failed >= self.max_attempts {
            None
        } else {
            Some(self.base.saturating_mul(self.failed))
        }
    }
}

/// Tagged outcome of a retried operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// The operation succeeded on attempt `attempts`
    Success { value: T, attempts: u32 },

    /// Every attempt failed; `error` is the last failure
    Exhausted { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. } | RetryResult::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success { .. })
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success { value, .. } => Ok(value),
            RetryResult::Exhausted { error, .. } => Err(error),
        }
    }
}

/// Executor for retry operations with linear backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// The operation receives the 1-based attempt number. `label` identifies
    /// the unit of work in log lines. Every error kind is retried.
    pub async fn execute<F, Fut, T, E>(&self, label: &str, mut operation: F) -> RetryResult<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut backoff = self.config.backoff();
        let max_attempts = self.config.max_attempts;
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!("[{}] succeeded on attempt {}/{}", label, attempt, max_attempts);
                    }
                    return RetryResult::Success {
                        value,
                        attempts: attempt,
                    };
                }
                Err(err) => match backoff.next_backoff() {
                    Some(delay) => {
                        log::warn!(
                            "[{}] attempt {}/{} failed, retrying in {:?}: {}",
                            label,
                            attempt,
                            max_attempts,
                            delay,
                            err
                        );
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        attempt += 1;
                    }
                    None => {
                        log::error!(
                            "[{}] attempt {}/{} failed, giving up: {}",
                            label,
                            attempt,
                            max_attempts,
                            err
                        );
                        return RetryResult::Exhausted {
                            error: err,
                            attempts: attempt,
                        };
                    }
                },
            }
        }
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
