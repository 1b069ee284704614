//! Error types for admission operations

/// Defensive errors for calls that contradict queue state. These mean a
/// caller skipped the `can_start` contract, not that the queue is broken.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a job is already running for category {0}")]
    SlotOccupied(String),

    #[error("no job is running for category {0}")]
    NotRunning(String),
}

/// Result alias for admission operations.
pub type Result<T> = std::result::Result<T, Error>;
