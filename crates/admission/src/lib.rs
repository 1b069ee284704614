//! Per-category admission control for scarce local compute
//!
//! Transcription, language-model, and search jobs each get one concurrency
//! slot; everyone else queues FIFO behind it and can ask where they stand.
//! The queue grants nothing by itself: callers poll `can_start`, start the
//! head entry, and report `finish` when done — keeping the queue free of
//! callback machinery.

pub mod error;
pub mod queue;

pub use error::{Error, Result};
pub use queue::{AdmissionQueue, AdmissionStatus, QueueEntry, RunHandle, RunningSlot};
