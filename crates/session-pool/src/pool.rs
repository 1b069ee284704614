//! Session bookkeeping and health-ranked selection
//!
//! Each session tracks usage/success/failure counters. The health score
//! `usage*10 + failures*100` deprioritizes worn sessions mildly and failing
//! sessions heavily, so a moderately failing session keeps serving while a
//! healthier one exists instead of flipping hard open/closed.
//!
//! Blocking transitions one way: once `failure_count` reaches the
//! configured threshold the session leaves rotation until `unblock_all`.
//! A success repays one failure, which lets a session ride out a transient
//! bad patch without getting blocked.

use std::time::Instant;

use common::Secret;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default failure threshold before a session is blocked.
pub const DEFAULT_BLOCK_AFTER_FAILURES: u64 = 3;

/// Usage and failure counters for one registered session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub usage_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_used: Option<Instant>,
    pub blocked: bool,
}

impl SessionStats {
    /// Percentage of recorded calls that succeeded; a fresh session counts
    /// as 100%.
    pub fn success_rate(&self) -> f64 {
        if self.usage_count == 0 {
            return 100.0;
        }
        (self.success_count as f64 / self.usage_count as f64) * 100.0
    }

    /// Lower is better. A failure weighs ten times as much as plain use.
    pub fn health_score(&self) -> u64 {
        self.usage_count * 10 + self.failure_count * 100
    }
}

/// A selected session, ready for one outbound call.
#[derive(Debug, Clone)]
pub struct SessionLease {
    pub id: String,
    pub credential: Secret<String>,
}

struct SessionEntry {
    id: String,
    credential: Secret<String>,
    stats: SessionStats,
}

/// Pool of reusable sessions for one remote target.
///
/// Entries keep registration order; the list sits behind a single RwLock
/// and every critical section is counter arithmetic only, no I/O.
pub struct SessionPool {
    sessions: RwLock<Vec<SessionEntry>>,
    block_after_failures: u64,
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_AFTER_FAILURES)
    }
}

impl SessionPool {
    /// A threshold of zero is clamped to 1.
    pub fn new(block_after_failures: u64) -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
            block_after_failures: block_after_failures.max(1),
        }
    }

    /// Register a credential under `id`. Re-registering an id is a no-op.
    pub async fn register(&self, id: impl Into<String>, credential: Secret<String>) {
        let id = id.into();
        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|s| s.id == id) {
            debug!(session_id = %id, "session already registered");
            return;
        }
        sessions.push(SessionEntry {
            id: id.clone(),
            credential,
            stats: SessionStats::default(),
        });
        info!(session_id = %id, total = sessions.len(), "session registered");
    }

    /// Pick the unblocked session with the lowest health score.
    ///
    /// Ties go to sessions never used yet, then to the longest-idle one,
    /// then to registration order. Selection does not mutate any counters;
    /// the caller records the outcome of the call it makes with the lease.
    ///
    /// `Exhausted` when nothing is selectable. Callers must surface this
    /// rather than retry: no attempt can succeed until credentials are
    /// refreshed and the pool is reset.
    pub async fn select_best(&self) -> Result<SessionLease> {
        let sessions = self.sessions.read().await;
        let best = sessions
            .iter()
            .filter(|s| !s.stats.blocked)
            .min_by_key(|s| (s.stats.health_score(), s.stats.last_used));
        match best {
            Some(entry) => {
                debug!(
                    session_id = %entry.id,
                    score = entry.stats.health_score(),
                    "session selected"
                );
                Ok(SessionLease {
                    id: entry.id.clone(),
                    credential: entry.credential.clone(),
                })
            }
            None => {
                let summary = exhausted_summary(&sessions);
                warn!("no selectable session: {summary}");
                Err(Error::Exhausted(summary))
            }
        }
    }

    /// Record the outcome of a call made with session `id`.
    ///
    /// Every outcome bumps `usage_count` and `last_used`. A success also
    /// repays one failure (floored at zero); a failure past the threshold
    /// blocks the session until `unblock_all`. Unknown ids are ignored
    /// with a warning.
    pub async fn record_outcome(&self, id: &str, success: bool) {
        let mut sessions = self.sessions.write().await;
        let Some(entry) = sessions.iter_mut().find(|s| s.id == id) else {
            warn!(session_id = %id, "outcome recorded for unknown session");
            return;
        };
        let stats = &mut entry.stats;
        stats.usage_count += 1;
        stats.last_used = Some(Instant::now());
        if success {
            stats.success_count += 1;
            stats.failure_count = stats.failure_count.saturating_sub(1);
        } else {
            stats.failure_count += 1;
            if !stats.blocked && stats.failure_count >= self.block_after_failures {
                stats.blocked = true;
                metrics::counter!("session_pool_blocked_total").increment(1);
                warn!(
                    session_id = %id,
                    failures = stats.failure_count,
                    "session blocked"
                );
            }
        }
        let result = if success { "success" } else { "failure" };
        metrics::counter!("session_pool_outcomes_total", "result" => result).increment(1);
    }

    /// Re-admit every session after the operator refreshed the underlying
    /// credentials. Usage and success history stays for reporting.
    pub async fn unblock_all(&self) {
        let mut sessions = self.sessions.write().await;
        for entry in sessions.iter_mut() {
            entry.stats.blocked = false;
            entry.stats.failure_count = 0;
        }
        info!(total = sessions.len(), "all sessions unblocked");
    }

    /// Stats snapshot for one session.
    pub async fn stats_for(&self, id: &str) -> Result<SessionStats> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.stats.clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Pool report for the operator status surface. Display only; control
    /// decisions stay inside the pool.
    ///
    /// Status mapping: all selectable → healthy, some → degraded,
    /// none → unhealthy.
    pub async fn report(&self) -> serde_json::Value {
        let sessions = self.sessions.read().await;
        let mut entries = Vec::new();
        let mut blocked_count = 0usize;
        for s in sessions.iter() {
            if s.stats.blocked {
                blocked_count += 1;
            }
            entries.push(serde_json::json!({
                "identifier": s.id,
                "usage_count": s.stats.usage_count,
                "success_count": s.stats.success_count,
                "failure_count": s.stats.failure_count,
                "success_rate": s.stats.success_rate(),
                "health_score": s.stats.health_score(),
                "blocked": s.stats.blocked,
            }));
        }
        let total = sessions.len();
        let available = total - blocked_count;
        let status = if available == total && total > 0 {
            "healthy"
        } else if available > 0 {
            "degraded"
        } else {
            "unhealthy"
        };
        serde_json::json!({
            "status": status,
            "sessions_total": total,
            "sessions_available": available,
            "sessions_blocked": blocked_count,
            "sessions": entries,
        })
    }
}

/// Build the exhausted error detail as JSON counts.
fn exhausted_summary(sessions: &[SessionEntry]) -> String {
    let total = sessions.len();
    let blocked = sessions.iter().filter(|s| s.stats.blocked).count();
    serde_json::json!({
        "error": {
            "type": "pool_exhausted",
            "message": "all sessions blocked or none registered",
            "pool": {
                "sessions_total": total,
                "sessions_blocked": blocked,
            }
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_with(ids: &[&str]) -> SessionPool {
        let pool = SessionPool::default();
        for id in ids {
            pool.register(*id, Secret::new(format!("cred_{id}"))).await;
        }
        pool
    }

    #[test]
    fn fresh_session_has_full_success_rate_and_zero_score() {
        let stats = SessionStats::default();
        assert_eq!(stats.success_rate(), 100.0);
        assert_eq!(stats.health_score(), 0);
    }

    #[test]
    fn health_score_weighs_failures_ten_to_one() {
        let stats = SessionStats {
            usage_count: 2,
            success_count: 1,
            failure_count: 1,
            last_used: None,
            blocked: false,
        };
        assert_eq!(stats.health_score(), 120);
        assert_eq!(stats.success_rate(), 50.0);
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let pool = pool_with(&["a"]).await;
        pool.register("a", Secret::new("other".to_string())).await;
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn selection_prefers_lowest_health_score() {
        let pool = pool_with(&["worn", "fresh"]).await;
        // Give "worn" one successful use: score 10 vs 0
        pool.record_outcome("worn", true).await;
        let lease = pool.select_best().await.unwrap();
        assert_eq!(lease.id, "fresh");
    }

    #[tokio::test]
    async fn blocked_sessions_are_skipped_even_with_best_score() {
        let pool = SessionPool::new(1);
        pool.register("cheap", Secret::new("c1".to_string())).await;
        pool.register("pricey", Secret::new("c2".to_string())).await;
        // Block "cheap" at score 110; wear "pricey" to score 200
        pool.record_outcome("cheap", false).await;
        for _ in 0..20 {
            pool.record_outcome("pricey", true).await;
        }
        let lease = pool.select_best().await.unwrap();
        assert_eq!(lease.id, "pricey");
    }

    #[tokio::test]
    async fn ties_go_to_registration_order_when_never_used() {
        let pool = pool_with(&["first", "second", "third"]).await;
        let lease = pool.select_best().await.unwrap();
        assert_eq!(lease.id, "first");
    }

    #[tokio::test]
    async fn equal_scores_prefer_longest_idle() {
        let pool = pool_with(&["a", "b"]).await;
        pool.record_outcome("a", true).await;
        pool.record_outcome("b", true).await;
        // Equal scores (10); "a" was used before "b"
        let lease = pool.select_best().await.unwrap();
        assert_eq!(lease.id, "a");
    }

    #[tokio::test]
    async fn selection_does_not_mutate_counters() {
        let pool = pool_with(&["a"]).await;
        let _ = pool.select_best().await.unwrap();
        let stats = pool.stats_for("a").await.unwrap();
        assert_eq!(stats.usage_count, 0);
        assert!(stats.last_used.is_none());
    }

    #[tokio::test]
    async fn failures_accumulate_and_block_at_threshold() {
        let pool = pool_with(&["a"]).await;
        for expected in 1..=2u64 {
            pool.record_outcome("a", false).await;
            let stats = pool.stats_for("a").await.unwrap();
            assert_eq!(stats.failure_count, expected);
            assert!(!stats.blocked);
        }
        pool.record_outcome("a", false).await;
        let stats = pool.stats_for("a").await.unwrap();
        assert_eq!(stats.failure_count, 3);
        assert!(stats.blocked);
    }

    #[tokio::test]
    async fn success_repays_one_failure_and_keeps_session_unblocked() {
        let pool = pool_with(&["a"]).await;
        pool.record_outcome("a", false).await;
        pool.record_outcome("a", false).await;
        pool.record_outcome("a", true).await;
        let stats = pool.stats_for("a").await.unwrap();
        assert_eq!(stats.failure_count, 1);
        assert!(!stats.blocked);
    }

    #[tokio::test]
    async fn failure_count_never_goes_negative() {
        let pool = pool_with(&["a"]).await;
        pool.record_outcome("a", true).await;
        let stats = pool.stats_for("a").await.unwrap();
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.success_count, 1);
    }

    #[tokio::test]
    async fn blocking_is_one_way_until_reset() {
        let pool = pool_with(&["a"]).await;
        for _ in 0..3 {
            pool.record_outcome("a", false).await;
        }
        // A later success must not unblock
        pool.record_outcome("a", true).await;
        let stats = pool.stats_for("a").await.unwrap();
        assert!(stats.blocked);
    }

    #[tokio::test]
    async fn exhausted_when_all_sessions_blocked() {
        let pool = pool_with(&["a", "b"]).await;
        for id in ["a", "b"] {
            for _ in 0..3 {
                pool.record_outcome(id, false).await;
            }
        }
        let err = pool.select_best().await.unwrap_err();
        assert!(err.to_string().contains("pool_exhausted"), "error: {err}");
    }

    #[tokio::test]
    async fn exhausted_when_empty() {
        let pool = SessionPool::default();
        let err = pool.select_best().await.unwrap_err();
        assert!(matches!(err, Error::Exhausted(_)));
    }

    #[tokio::test]
    async fn unblock_all_resets_failures_but_keeps_history() {
        let pool = pool_with(&["a"]).await;
        pool.record_outcome("a", true).await;
        for _ in 0..3 {
            pool.record_outcome("a", false).await;
        }
        pool.unblock_all().await;
        let stats = pool.stats_for("a").await.unwrap();
        assert!(!stats.blocked);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.usage_count, 4);
        assert_eq!(stats.success_count, 1);
        assert!(pool.select_best().await.is_ok());
    }

    #[tokio::test]
    async fn unknown_session_outcome_is_ignored() {
        let pool = pool_with(&["a"]).await;
        pool.record_outcome("ghost", false).await;
        assert_eq!(pool.len().await, 1);
        assert!(matches!(
            pool.stats_for("ghost").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn lease_exposes_registered_credential() {
        let pool = pool_with(&["jar-1"]).await;
        let lease = pool.select_best().await.unwrap();
        assert_eq!(lease.id, "jar-1");
        assert_eq!(lease.credential.expose(), "cred_jar-1");
    }

    #[tokio::test]
    async fn report_lists_every_field_the_operator_needs() {
        let pool = pool_with(&["a"]).await;
        pool.record_outcome("a", true).await;
        pool.record_outcome("a", false).await;
        let report = pool.report().await;
        assert_eq!(report["status"], "healthy");
        let entry = &report["sessions"][0];
        assert_eq!(entry["identifier"], "a");
        assert_eq!(entry["usage_count"], 2);
        assert_eq!(entry["success_count"], 1);
        assert_eq!(entry["failure_count"], 1);
        assert_eq!(entry["success_rate"], 50.0);
        assert_eq!(entry["health_score"], 120);
        assert_eq!(entry["blocked"], false);
    }

    #[tokio::test]
    async fn report_status_degrades_then_goes_unhealthy() {
        let pool = pool_with(&["a", "b"]).await;
        for _ in 0..3 {
            pool.record_outcome("a", false).await;
        }
        assert_eq!(pool.report().await["status"], "degraded");
        for _ in 0..3 {
            pool.record_outcome("b", false).await;
        }
        let report = pool.report().await;
        assert_eq!(report["status"], "unhealthy");
        assert_eq!(report["sessions_blocked"], 2);
    }

    #[tokio::test]
    async fn empty_pool_reports_unhealthy() {
        let pool = SessionPool::default();
        let report = pool.report().await;
        assert_eq!(report["status"], "unhealthy");
        assert_eq!(report["sessions_total"], 0);
    }

    #[tokio::test]
    async fn failures_rotate_across_sessions_and_exhaust_the_pool() {
        // Threshold 5: each session absorbs five failures before blocking,
        // so three sessions exhaust after exactly 15 recorded failures.
        let pool = SessionPool::new(5);
        for id in ["c1", "c2", "c3"] {
            pool.register(id, Secret::new(format!("cred_{id}"))).await;
        }

        let mut blocked_history = Vec::new();
        for _ in 0..15 {
            let lease = pool.select_best().await.unwrap();
            pool.record_outcome(&lease.id, false).await;
            let mut blocked = 0;
            for id in ["c1", "c2", "c3"] {
                if pool.stats_for(id).await.unwrap().blocked {
                    blocked += 1;
                }
            }
            blocked_history.push(blocked);
        }

        // One session blocks at a time, on failures 13, 14, and 15
        assert_eq!(blocked_history[11], 0);
        assert_eq!(blocked_history[12], 1);
        assert_eq!(blocked_history[13], 2);
        assert_eq!(blocked_history[14], 3);
        assert!(matches!(
            pool.select_best().await,
            Err(Error::Exhausted(_))
        ));
    }
}
