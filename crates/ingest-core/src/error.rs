//! Fetch-path error taxonomy
//!
//! Every failure from the remote content source lands in one of three
//! classes: transient (retry with backoff), session-blocking (report the
//! session to the pool and rotate identity), or fatal (abort now). The
//! variants carry the upstream detail for operator-facing messages.

use pacing::{Classify, FailureKind};

/// Errors surfaced by fetch operations against the remote source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("remote rate limit hit: {0}")]
    RateLimited(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("session rejected by remote service: {0}")]
    SessionBlocked(String),

    #[error("content is geo-restricted: {0}")]
    GeoRestricted(String),

    #[error("content not found: {0}")]
    NotFound(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("session pool exhausted: {0}")]
    Exhausted(String),
}

impl Classify for FetchError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            FetchError::Timeout(_) | FetchError::RateLimited(_) | FetchError::Upstream(_) => {
                FailureKind::Transient
            }
            FetchError::SessionBlocked(_) => FailureKind::SessionBlocking,
            FetchError::GeoRestricted(_)
            | FetchError::NotFound(_)
            | FetchError::InvalidUrl(_)
            | FetchError::Exhausted(_) => FailureKind::Fatal,
        }
    }
}

impl From<session_pool::Error> for FetchError {
    fn from(err: session_pool::Error) -> Self {
        match err {
            session_pool::Error::Exhausted(msg) => FetchError::Exhausted(msg),
            other => FetchError::Upstream(other.to_string()),
        }
    }
}

/// Result alias for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
