//! Resilient fetch orchestration
//!
//! One entry point for talking to the remote content source: take a rate
//! limiter slot, then run the operation under the retry policy with the
//! healthiest session and the current client profile. Outcomes feed the
//! session pool; a session-blocking failure also rotates the client
//! fingerprint before the next attempt.

use std::sync::Arc;

use pacing::{Classify, ClientProfile, FailureKind, IdentityRotator, RateLimiter, RetryPolicy};
use session_pool::{SessionLease, SessionPool};
use tracing::debug;

use crate::error::Result;

/// Composed fetch pipeline: rate limiting, retries, session selection,
/// and identity rotation around one fallible remote operation.
///
/// The pool is shared (the operator status surface reads it too); the
/// limiter, retry policy, and rotator belong to this fetcher.
pub struct Fetcher {
    pool: Arc<SessionPool>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    rotator: IdentityRotator,
}

impl Fetcher {
    pub fn new(
        pool: Arc<SessionPool>,
        limiter: RateLimiter,
        retry: RetryPolicy,
        rotator: IdentityRotator,
    ) -> Self {
        Self {
            pool,
            limiter,
            retry,
            rotator,
        }
    }

    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    pub fn rotator(&self) -> &IdentityRotator {
        &self.rotator
    }

    /// Run `op` against the remote source with the full resilience stack.
    ///
    /// The rate limiter is taken once per logical call; retries run inside
    /// it. `op` receives a session lease and the client profile to present,
    /// and classifies its own failures through the `FetchError` variants:
    /// transient and session-blocking failures are retried with backoff,
    /// fatal ones abort without touching the pool. An exhausted pool aborts
    /// with `Exhausted` — new attempts cannot help until credentials are
    /// refreshed.
    pub async fn fetch<T, F>(&self, mut op: F) -> Result<T>
    where
        F: AsyncFnMut(SessionLease, ClientProfile) -> Result<T>,
    {
        self.limiter.acquire().await;
        self.retry
            .run(async |attempt| {
                let lease = self.pool.select_best().await?;
                let profile = self.rotator.current();
                debug!(
                    session_id = %lease.id,
                    profile = %profile.name,
                    attempt,
                    "dispatching fetch attempt"
                );
                match op(lease.clone(), profile).await {
                    Ok(value) => {
                        self.pool.record_outcome(&lease.id, true).await;
                        Ok(value)
                    }
                    Err(err) => {
                        match err.failure_kind() {
                            FailureKind::Transient => {
                                self.pool.record_outcome(&lease.id, false).await;
                            }
                            FailureKind::SessionBlocking => {
                                self.pool.record_outcome(&lease.id, false).await;
                                self.rotator.advance();
                            }
                            FailureKind::Fatal => {}
                        }
                        Err(err)
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use common::Secret;
    use std::time::Duration;

    async fn fetcher_with(ids: &[&str]) -> Fetcher {
        let pool = Arc::new(SessionPool::default());
        for id in ids {
            pool.register(*id, Secret::new(format!("cred_{id}"))).await;
        }
        Fetcher::new(
            pool,
            RateLimiter::new(100, Duration::from_secs(1)),
            RetryPolicy::new(4, Duration::from_millis(10), 2.0),
            IdentityRotator::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn success_records_a_success_against_the_session() {
        let fetcher = fetcher_with(&["a"]).await;
        let got = fetcher
            .fetch(async |lease, _profile| Ok(lease.id.clone()))
            .await
            .unwrap();
        assert_eq!(got, "a");
        let stats = fetcher.pool().stats_for("a").await.unwrap();
        assert_eq!(stats.usage_count, 1);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_block_rotates_identity_and_retries() {
        let fetcher = fetcher_with(&["a"]).await;
        assert_eq!(fetcher.rotator().current().name, "web");

        let mut calls = 0u32;
        let got = fetcher
            .fetch(async |_lease, _profile| {
                calls += 1;
                if calls <= 2 {
                    Err(FetchError::SessionBlocked("sign in".into()))
                } else {
                    Ok(calls)
                }
            })
            .await
            .unwrap();

        assert_eq!(got, 3);
        // Two blocks moved the cursor web → android → ios
        assert_eq!(fetcher.rotator().current().name, "ios");
        let stats = fetcher.pool().stats_for("a").await.unwrap();
        assert_eq!(stats.usage_count, 3);
        // Two failures, one repaid by the final success
        assert_eq!(stats.failure_count, 1);
        assert!(!stats.blocked);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_recorded_but_do_not_rotate() {
        let fetcher = fetcher_with(&["a", "b"]).await;
        let mut calls = 0u32;
        let result: Result<()> = fetcher
            .fetch(async |_lease, _profile| {
                calls += 1;
                Err(FetchError::Timeout("30s".into()))
            })
            .await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
        assert_eq!(calls, 4);
        assert_eq!(fetcher.rotator().current().name, "web");
        // Four failures spread across the two sessions
        for id in ["a", "b"] {
            let stats = fetcher.pool().stats_for(id).await.unwrap();
            assert_eq!(stats.usage_count, 2);
            assert_eq!(stats.failure_count, 2);
            assert!(!stats.blocked);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_failure_aborts_without_touching_the_pool() {
        let fetcher = fetcher_with(&["a"]).await;
        let mut calls = 0u32;
        let result: Result<()> = fetcher
            .fetch(async |_lease, _profile| {
                calls += 1;
                Err(FetchError::NotFound("gone".into()))
            })
            .await;
        assert!(matches!(result, Err(FetchError::NotFound(_))));
        assert_eq!(calls, 1);
        let stats = fetcher.pool().stats_for("a").await.unwrap();
        assert_eq!(stats.usage_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_pool_is_surfaced_without_running_the_operation() {
        let fetcher = fetcher_with(&["a"]).await;
        for _ in 0..3 {
            fetcher.pool().record_outcome("a", false).await;
        }
        let mut calls = 0u32;
        let result: Result<()> = fetcher
            .fetch(async |_lease, _profile| {
                calls += 1;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(FetchError::Exhausted(_))));
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn blocking_failures_move_selection_to_the_next_session() {
        let fetcher = fetcher_with(&["first", "second"]).await;
        let mut seen = Vec::new();
        let result: Result<()> = fetcher
            .fetch(async |lease, _profile| {
                seen.push(lease.id.clone());
                Err(FetchError::SessionBlocked("sign in".into()))
            })
            .await;
        assert!(result.is_err());
        // Each failure raises the used session's score, so attempts
        // alternate between the two registered sessions.
        assert_eq!(seen, vec!["first", "second", "first", "second"]);
    }
}
