//! Resilient resource-access and task-admission core
//!
//! Orchestration glue for a personal content-ingestion pipeline. Outbound
//! fetches go through rate limiting, retries with backoff, health-ranked
//! session selection, and client-identity rotation; local compute jobs
//! (transcription, analysis, search) queue through per-category admission
//! control. The downloader, the speech-to-text engine, the language-model
//! server, and the chat front end stay outside this crate and reach it
//! through [`Core`].

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;

pub use classify::classify_output;
pub use config::{AdmissionConfig, Config, LimiterConfig, PoolConfig, RetryConfig};
pub use context::Core;
pub use error::{FetchError, Result};
pub use fetch::Fetcher;
