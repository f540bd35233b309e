//! Capped exponential-backoff retry for store calls.
//!
//! DESIGN
//! ======
//! Every `Store` round trip goes through [`RetryPolicy::run`]. Errors opt in
//! to retries through [`Retryable`]; anything not flagged transient is
//! returned on the first failure without sleeping.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Classifies errors as transient (worth another attempt) or terminal.
pub trait Retryable: std::fmt::Display {
    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call. Always at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Factor applied to the delay after each further failure.
    pub multiplier: u32,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(crate::config::DEFAULT_RETRY_BASE_DELAY_MS),
            multiplier: crate::config::DEFAULT_RETRY_MULTIPLIER,
            max_delay: Duration::from_millis(crate::config::DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[cfg(test)]
    #[must_use]
    pub fn none() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO, multiplier: 1, max_delay: Duration::ZERO }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `f` until it succeeds, fails terminally, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once
    /// `max_attempts` calls have failed.
    pub async fn run<T, E, F, Fut>(&self, op: &str, mut f: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        error = %e,
                        op,
                        attempt,
                        total = max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transient store error; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Retryable for sqlx::Error {
    fn retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::PoolTimedOut | Self::PoolClosed | Self::WorkerCrashed | Self::Protocol(_) => true,
            Self::Database(db) => db.code().is_some_and(|code| is_transient_sqlstate(&code)),
            _ => false,
        }
    }
}

/// SQLSTATE codes worth retrying: connection failures, serialization
/// conflicts, connection exhaustion and server shutdown.
pub(crate) fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "40001" | "40P01" | "53300" | "57P01" | "57P02" | "57P03")
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
