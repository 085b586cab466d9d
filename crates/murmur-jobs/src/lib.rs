//! # murmur-jobs
//!
//! Bounded-concurrency queue for long-running transcription jobs.
//!
//! - At most `max_concurrent_jobs` jobs run at once; the rest wait FIFO.
//! - Progress is monotonically non-decreasing and reaches 1.0 exactly when
//!   a job completes.
//! - Cancelling a pending job is immediate; cancelling a processing job
//!   fires its cancel token, observed by the pipeline at the next segment
//!   boundary.
//! - A reaper deletes terminal jobs after their TTL; `shutdown` cancels
//!   everything still queued.

#![deny(unsafe_code)]

mod queue;
mod types;

pub use queue::{JobQueue, JobQueueConfig};
pub use types::{JobError, JobFailure, JobInfo, JobInput, JobRunner, JobState, JobStats, ProgressFn};
