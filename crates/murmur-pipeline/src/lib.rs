//! # murmur-pipeline
//!
//! Drives the recognizer over an ordered segment list and merges the
//! results.
//!
//! - Invocations may be pipelined (bounded width, default 1) but results
//!   always emit in segment-index order; out-of-order completions buffer.
//! - A failing segment contributes an empty transcription with an error
//!   annotation; only an all-segment failure fails the invocation.
//! - Progress lands on a [`ProgressSink`] after each ordered emission, with
//!   the running merged transcript.
//! - Cancellation is cooperative: the flag is polled between segments, and
//!   in-flight recognitions finish detached with their results discarded.

#![deny(unsafe_code)]

mod merge;
mod orchestrator;
mod progress;
mod types;

pub use merge::{merge, MergeOutcome};
pub use orchestrator::{run, PipelineError, PipelineOptions};
pub use progress::{FnSink, NullSink, ProgressSink, ProgressUpdate};
pub use types::{MergeStats, MergeStrategy, PipelineOutput, SegmentTranscript};
