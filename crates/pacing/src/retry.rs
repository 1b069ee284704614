//! Retry with exponential backoff and jitter
//!
//! `RetryPolicy::run` re-executes a fallible async operation. The
//! operation classifies its own failures (`Classify`): transient and
//! session-blocking failures consume an attempt and back off, fatal
//! failures abort immediately without consuming the remaining attempts.

use std::fmt;
use std::time::Duration;

use rand::RngExt;
use tokio::time::sleep;
use tracing::warn;

/// How a failed call should be treated by the retry loop and the caller.
///
/// - `Transient` retries as-is (no pool action beyond outcome recording)
/// - `SessionBlocking` tells the caller to report the session to the pool
///   and rotate identity before the next attempt
/// - `Fatal` aborts: retrying cannot help
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeouts, remote rate limits, generic upstream failures.
    Transient,
    /// The session/credential used for the call is being rejected.
    SessionBlocking,
    /// Bad input, missing content, exhausted pool.
    Fatal,
}

/// Classification hook implemented by operation error types.
pub trait Classify {
    fn failure_kind(&self) -> FailureKind;
}

/// Bounded exponential backoff: `base_delay * multiplier^attempt`, with
/// ±10% jitter applied to each executed delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A `max_attempts` of zero is clamped to 1.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_multiplier,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay scheduled after failed attempt `attempt` (zero-based),
    /// before jitter.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let scale = self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * scale)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let factor = rand::rng().random_range(0.9..=1.1);
        Duration::from_secs_f64(self.nominal_delay(attempt).as_secs_f64() * factor)
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the zero-based attempt index. The final error is
    /// returned to the caller unchanged.
    pub async fn run<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        E: Classify + fmt::Display,
        F: AsyncFnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.failure_kind() == FailureKind::Fatal => return Err(err),
                Err(err) => {
                    if attempt + 1 >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.jittered_delay(attempt);
                    metrics::counter!("retry_backoffs_total").increment(1);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
