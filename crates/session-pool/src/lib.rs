//! Health-ranked session pool for a bot-hostile remote service
//!
//! Owns the reusable sessions (cookie jars, tokens) used to talk to one
//! remote target. Selection picks the session with the best health score;
//! every call outcome feeds back into that score. Sessions that keep
//! failing are circuit-broken out of rotation until an operator refreshes
//! the underlying credentials and resets the pool.
//!
//! Session lifecycle:
//! 1. Host registers each credential at startup → counters start clean
//! 2. Caller selects the best session for an outbound call
//! 3. Caller records the outcome; failures decay health, successes repair it
//! 4. A session reaching the failure threshold is blocked (one-way)
//! 5. `unblock_all` re-admits every session after credentials are refreshed

pub mod error;
pub mod pool;

pub use error::{Error, Result};
pub use pool::{DEFAULT_BLOCK_AFTER_FAILURES, SessionLease, SessionPool, SessionStats};
