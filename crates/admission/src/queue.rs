//! FIFO queues and running slots, one pair per task category
//!
//! A category is a scarce local engine ("transcribe", "analyze",
//! "search"). Each holds a FIFO of waiting requesters and at most one
//! running slot; categories never see each other, so a long transcription
//! cannot delay an analysis job.
//!
//! Admission is pull-based. `enqueue` only records interest; the caller
//! watches `can_start`, promotes the head entry with `start`, and reports
//! `finish`. FIFO order of who becomes eligible next is preserved
//! internally; actually starting in that order is the caller's contract.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Handle for one admitted run, minted by the caller at start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunHandle(Uuid);

impl RunHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One waiting requester.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub requester_id: i64,
    pub label: String,
    pub enqueued_at: Instant,
}

/// The single job currently admitted for a category.
#[derive(Debug, Clone)]
pub struct RunningSlot {
    pub requester_id: i64,
    pub label: String,
    pub handle: RunHandle,
}

/// Where a requester stands within one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionStatus {
    Running { handle: RunHandle },
    Queued { position: usize, total: usize },
    NotInQueue,
}

#[derive(Default)]
struct CategoryState {
    waiting: VecDeque<QueueEntry>,
    running: Option<RunningSlot>,
}

/// Admission controller: one FIFO queue and at most one running job per
/// category.
///
/// All operations are short critical sections over one lock — counter and
/// list work only, no I/O. Categories the host never mentioned materialize
/// lazily on `enqueue`, so `enqueue` cannot fail.
#[derive(Default)]
pub struct AdmissionQueue {
    categories: RwLock<HashMap<String, CategoryState>>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create categories so `status`/`can_start` answer for them
    /// before anyone enqueues.
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = categories
            .into_iter()
            .map(|c| (c.into(), CategoryState::default()))
            .collect();
        Self {
            categories: RwLock::new(map),
        }
    }

    /// Queue `requester_id` for `category` and return the 1-based
    /// position. Re-enqueueing while already queued returns the existing
    /// position without adding a duplicate.
    pub async fn enqueue(&self, category: &str, requester_id: i64, label: &str) -> usize {
        let mut categories = self.categories.write().await;
        let state = categories.entry(category.to_string()).or_default();
        if let Some(pos) = state
            .waiting
            .iter()
            .position(|e| e.requester_id == requester_id)
        {
            debug!(category, requester_id, position = pos + 1, "already queued");
            return pos + 1;
        }
        state.waiting.push_back(QueueEntry {
            requester_id,
            label: label.to_string(),
            enqueued_at: Instant::now(),
        });
        let position = state.waiting.len();
        metrics::counter!("admission_enqueued_total", "category" => category.to_string())
            .increment(1);
        metrics::gauge!("admission_queue_depth", "category" => category.to_string())
            .set(position as f64);
        info!(category, requester_id, label, position, "requester queued");
        position
    }

    /// True when the category has no running job and someone is waiting.
    pub async fn can_start(&self, category: &str) -> bool {
        let categories = self.categories.read().await;
        categories
            .get(category)
            .is_some_and(|s| s.running.is_none() && !s.waiting.is_empty())
    }

    /// Admit `requester_id` into the category's running slot and drop the
    /// matching queue entry if present.
    ///
    /// The slot must be empty; a caller hitting `SlotOccupied` skipped the
    /// `can_start` check. Which requester to start (normally the head of
    /// the queue) is the caller's decision.
    pub async fn start(
        &self,
        category: &str,
        requester_id: i64,
        label: &str,
        handle: RunHandle,
    ) -> Result<()> {
        let mut categories = self.categories.write().await;
        let state = categories.entry(category.to_string()).or_default();
        if state.running.is_some() {
            return Err(Error::SlotOccupied(category.to_string()));
        }
        state.waiting.retain(|e| e.requester_id != requester_id);
        state.running = Some(RunningSlot {
            requester_id,
            label: label.to_string(),
            handle,
        });
        metrics::counter!("admission_started_total", "category" => category.to_string())
            .increment(1);
        metrics::gauge!("admission_queue_depth", "category" => category.to_string())
            .set(state.waiting.len() as f64);
        info!(category, requester_id, label, %handle, "job started");
        Ok(())
    }

    /// Clear the category's running slot and return it.
    ///
    /// The next queued entry is not auto-promoted; callers poll
    /// `can_start` and start it themselves.
    pub async fn finish(&self, category: &str) -> Result<RunningSlot> {
        let mut categories = self.categories.write().await;
        let slot = categories
            .get_mut(category)
            .and_then(|s| s.running.take())
            .ok_or_else(|| Error::NotRunning(category.to_string()))?;
        info!(category, requester_id = slot.requester_id, "job finished");
        Ok(slot)
    }

    /// Drop a queued entry. Returns false when the requester is not
    /// waiting (already started, already finished, or never queued).
    pub async fn remove(&self, category: &str, requester_id: i64) -> bool {
        let mut categories = self.categories.write().await;
        let Some(state) = categories.get_mut(category) else {
            return false;
        };
        let before = state.waiting.len();
        state.waiting.retain(|e| e.requester_id != requester_id);
        let removed = state.waiting.len() < before;
        if removed {
            metrics::gauge!("admission_queue_depth", "category" => category.to_string())
                .set(state.waiting.len() as f64);
            debug!(category, requester_id, "queued entry removed");
        }
        removed
    }

    /// Report where `requester_id` stands in `category`.
    pub async fn status(&self, category: &str, requester_id: i64) -> AdmissionStatus {
        let categories = self.categories.read().await;
        let Some(state) = categories.get(category) else {
            return AdmissionStatus::NotInQueue;
        };
        if let Some(slot) = &state.running
            && slot.requester_id == requester_id
        {
            return AdmissionStatus::Running {
                handle: slot.handle,
            };
        }
        match state
            .waiting
            .iter()
            .position(|e| e.requester_id == requester_id)
        {
            Some(pos) => AdmissionStatus::Queued {
                position: pos + 1,
                total: state.waiting.len(),
            },
            None => AdmissionStatus::NotInQueue,
        }
    }

    /// Queue depths and running slots for the operator surface.
    pub async fn report(&self) -> serde_json::Value {
        let categories = self.categories.read().await;
        let mut out = serde_json::Map::new();
        for (name, state) in categories.iter() {
            let running = state.running.as_ref().map(|s| {
                serde_json::json!({
                    "requester_id": s.requester_id,
                    "label": s.label,
                    "handle": s.handle.to_string(),
                })
            });
            let waiting: Vec<serde_json::Value> = state
                .waiting
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "requester_id": e.requester_id,
                        "label": e.label,
                    })
                })
                .collect();
            out.insert(
                name.clone(),
                serde_json::json!({
                    "running": running,
                    "depth": state.waiting.len(),
                    "waiting": waiting,
                }),
            );
        }
        serde_json::Value::Object(out)
    }
}
