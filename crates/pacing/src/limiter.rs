//! Rolling-window rate limiter
//!
//! Keeps the timestamps of recent grants and blocks a caller until the
//! oldest grant ages out of the window. A small random jitter is added to
//! each throttled wait so concurrent callers do not re-enter in lockstep.

use std::collections::VecDeque;
use std::time::Duration;

use rand::RngExt;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Upper bound on the random re-entry jitter added to a throttled wait.
const REENTRY_JITTER_MS: u64 = 25;

/// Bounds outbound call frequency to `calls` per rolling `period`,
/// independent of which session or profile the call uses.
///
/// The grant timestamp list is the only state and sits behind a single
/// mutex; the lock is never held across a sleep.
pub struct RateLimiter {
    calls: usize,
    period: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// A `calls` of zero is clamped to 1.
    pub fn new(calls: usize, period: Duration) -> Self {
        Self {
            calls: calls.max(1),
            period,
            grants: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until the rolling window has capacity, then record a grant.
    ///
    /// No window of length `period` ever observes more than `calls`
    /// grants, regardless of how many tasks call this concurrently. The
    /// limiter always grants eventually: grants age out as time passes.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut grants = self.grants.lock().await;
                let now = Instant::now();
                while let Some(front) = grants.front() {
                    if now.duration_since(*front) >= self.period {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }
                if grants.len() < self.calls {
                    grants.push_back(now);
                    return;
                }
                // Window full: front entry is the next to age out.
                self.period.saturating_sub(now.duration_since(grants[0]))
            };

            let jitter = Duration::from_millis(rand::rng().random_range(0..=REENTRY_JITTER_MS));
            metrics::counter!("rate_limiter_throttled_total").increment(1);
            debug!(
                wait_ms = (wait + jitter).as_millis() as u64,
                "rate limit reached, waiting"
            );
            sleep(wait + jitter).await;
        }
    }

    /// Run `op` after acquiring a slot in the window.
    pub async fn run<T, F>(&self, op: F) -> T
    where
        F: AsyncFnOnce() -> T,
    {
        self.acquire().await;
        op().await
    }
}
