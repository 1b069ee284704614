//! Error types for pool operations

/// Errors from session pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("session pool exhausted: {0}")]
    Exhausted(String),

    #[error("session not found: {0}")]
    NotFound(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
