//! Downloader diagnostics classification
//!
//! The external downloader reports failures as free-text diagnostics on
//! stderr. Known phrases map onto the fetch error taxonomy; anything
//! unrecognized counts as a transient upstream failure and gets retried.

use crate::error::FetchError;

/// Phrases meaning the remote service rejected the session or fingerprint.
const SESSION_BLOCK_PATTERNS: &[&str] = &[
    "sign in",
    "not a bot",
    "bot",
    "login required",
    "consent",
];

/// Phrases meaning the content is unavailable in this region.
const GEO_PATTERNS: &[&str] = &["geo", "location", "not available in your country"];

/// Phrases meaning the content is gone; retrying cannot help.
const NOT_FOUND_PATTERNS: &[&str] = &[
    "video unavailable",
    "not found",
    "private video",
    "has been removed",
    "does not exist",
];

/// Phrases meaning we were throttled and should back off.
const RATE_LIMIT_PATTERNS: &[&str] = &["429", "too many requests", "rate limit"];

/// Length cap on the diagnostic text carried inside an error.
const DETAIL_CHARS: usize = 200;

/// Map one downloader diagnostic to a typed fetch error.
///
/// Session blocks are checked first: phrases like "sign in to confirm
/// you're not a bot" also mention throttling in some variants, and the
/// session is the thing that needs replacing.
pub fn classify_output(stderr: &str) -> FetchError {
    let lower = stderr.to_lowercase();
    let detail = summarize(stderr);
    if SESSION_BLOCK_PATTERNS.iter().any(|p| lower.contains(p)) {
        return FetchError::SessionBlocked(detail);
    }
    if GEO_PATTERNS.iter().any(|p| lower.contains(p)) {
        return FetchError::GeoRestricted(detail);
    }
    if NOT_FOUND_PATTERNS.iter().any(|p| lower.contains(p)) {
        return FetchError::NotFound(detail);
    }
    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return FetchError::RateLimited(detail);
    }
    FetchError::Upstream(detail)
}

fn summarize(stderr: &str) -> String {
    stderr.chars().take(DETAIL_CHARS).collect()
}
