/*
* Bounded retry of flaky boundary operations
* (lifecycle scripts, peer notification).
*
* A policy is a plain value applied at call sites:
* attempts, inter-attempt delay with exponential backoff,
* and a retryable predicate carried by the error type.
* Non retryable errors are returned at once; once the attempt budget is
* spent, the last error is propagated.
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

// Error handling
use fpnd_error::NetError;
use log::{debug, warn};
use owo_colors::OwoColorize;

/// Errors telling whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for NetError {
    fn is_retryable(&self) -> bool {
        NetError::is_retryable(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub delay: u64,
    /// Delay multiplier applied after each failed attempt.
    pub backoff: f64,
    /// Upper bound of a single delay, in milliseconds.
    pub max_delay: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: 1000,
            backoff: 2.0,
            max_delay: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32) as i32;
        let factor = if self.backoff.is_finite() && self.backoff > 0.0 {
            self.backoff.powi(exp)
        } else {
            1.0
        };
        let ms = (self.delay as f64 * factor).min(self.max_delay as f64);
        Duration::from_millis(ms.max(0.0) as u64)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Blocking retry. `op` receives the 1-based attempt number.
    pub fn retry<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        E: Retryable + fmt::Display,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}, retrying in {:?}",
                        "[retry]".yellow(),
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    debug!("{} giving up after {} attempt(s)", "[retry]".red(), attempt);
                    return Err(e);
                }
            }
        }
    }

    /// Async retry, sleeping on the tokio timer between attempts.
    pub async fn retry_async<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}, retrying in {:?}",
                        "[retry]".yellow(),
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("{} giving up after {} attempt(s)", "[retry]".red(), attempt);
                    return Err(e);
                }
            }
        }
    }
}
