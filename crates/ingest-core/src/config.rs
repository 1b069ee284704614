//! Configuration for the ingestion core
//!
//! Loaded from TOML with per-field defaults, so a missing section falls
//! back to the production constants. Validation runs at load time: a zero
//! call budget or a shrinking backoff is a configuration error, not a
//! runtime surprise.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use pacing::{RateLimiter, RetryPolicy};

/// Root configuration for the core.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limiter: LimiterConfig,
    pub retry: RetryConfig,
    pub pool: PoolConfig,
    pub admission: AdmissionConfig,
}

/// Rolling-window limiter settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub calls: usize,
    pub period_secs: f64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            calls: 1,
            period_secs: 2.0,
        }
    }
}

impl LimiterConfig {
    pub fn build(&self) -> RateLimiter {
        RateLimiter::new(self.calls, Duration::from_secs_f64(self.period_secs))
    }
}

/// Retry policy settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_secs: 2.0,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn build(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs_f64(self.base_delay_secs),
            self.backoff_multiplier,
        )
    }
}

/// Session pool settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub block_after_failures: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_after_failures: 3,
        }
    }
}

/// Task categories the admission queue serves. The set is defined by the
/// host application; these are the engines the pipeline ships with.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub categories: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            categories: vec!["transcribe".into(), "analyze".into(), "search".into()],
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the components cannot run with.
    pub fn validate(&self) -> common::Result<()> {
        if self.limiter.calls == 0 {
            return Err(common::Error::Config(
                "limiter.calls must be at least 1".into(),
            ));
        }
        if self.limiter.period_secs <= 0.0 {
            return Err(common::Error::Config(format!(
                "limiter.period_secs must be positive, got {}",
                self.limiter.period_secs
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(common::Error::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.base_delay_secs <= 0.0 {
            return Err(common::Error::Config(format!(
                "retry.base_delay_secs must be positive, got {}",
                self.retry.base_delay_secs
            )));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(common::Error::Config(format!(
                "retry.backoff_multiplier must be at least 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if self.pool.block_after_failures == 0 {
            return Err(common::Error::Config(
                "pool.block_after_failures must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
