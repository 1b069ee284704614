//! Explicit wiring of the core components
//!
//! Request handlers receive this context instead of reaching for
//! process-wide singletons; tests build a fresh one per case.

use std::sync::Arc;

use admission::AdmissionQueue;
use pacing::{IdentityRotator, builtin_profiles};
use session_pool::SessionPool;

use crate::config::Config;
use crate::fetch::Fetcher;

/// The assembled core: session pool, fetch pipeline, admission queue.
///
/// The pool appears twice on purpose — inside the fetcher for selection
/// and here for the operator status surface and credential registration.
pub struct Core {
    pub pool: Arc<SessionPool>,
    pub fetcher: Fetcher,
    pub admission: AdmissionQueue,
}

impl Core {
    /// Build every component from one validated configuration.
    pub fn from_config(config: &Config) -> Self {
        let pool = Arc::new(SessionPool::new(config.pool.block_after_failures));
        let fetcher = Fetcher::new(
            Arc::clone(&pool),
            config.limiter.build(),
            config.retry.build(),
            IdentityRotator::new(builtin_profiles()),
        );
        let admission = AdmissionQueue::with_categories(config.admission.categories.iter().cloned());
        Self {
            pool,
            fetcher,
            admission,
        }
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
