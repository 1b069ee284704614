//! Outbound call pacing: rate limiting, retry, identity rotation
//!
//! Three cooperating pieces used on the path to a rate-limiting,
//! bot-hostile remote service:
//! 1. `RateLimiter` bounds call frequency over a rolling window.
//! 2. `RetryPolicy` re-runs a fallible operation with exponential backoff
//!    and jitter, honoring the `FailureKind` each error reports.
//! 3. `IdentityRotator` cycles synthetic client profiles when the remote
//!    side starts rejecting the current fingerprint.
//!
//! None of these hold a lock across a sleep, so one caller backing off
//! never starves the others.

pub mod limiter;
pub mod profile;
pub mod retry;

pub use limiter::RateLimiter;
pub use profile::{ClientProfile, IdentityRotator, builtin_profiles};
pub use retry::{Classify, FailureKind, RetryPolicy};
