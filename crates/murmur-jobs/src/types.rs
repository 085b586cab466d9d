//! Job queue data types and the runner capability.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use murmur_core::{Language, ServiceError};
use murmur_pipeline::MergeStrategy;
use murmur_segment::SegmentStrategy;
use murmur_text::PostProcessMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Job lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued, waiting for a worker.
    Pending,
    /// A worker is transcribing it.
    Processing,
    /// Finished with a result (terminal).
    Completed,
    /// Finished with an error (terminal).
    Failed,
    /// Cancelled before or during processing (terminal).
    Cancelled,
}

impl JobState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Wire name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for JobState {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown job status: {other:?}"
            ))),
        }
    }
}

/// Everything a worker needs to process one upload.
#[derive(Clone, Debug)]
pub struct JobInput {
    /// Canonical PCM, already decoded from the uploaded container.
    pub samples: Vec<i16>,
    /// Original filename, for operator-facing listings.
    pub filename: Option<String>,
    /// Language hint.
    pub language: Language,
    /// Segmentation strategy.
    pub strategy: SegmentStrategy,
    /// Merge strategy.
    pub merge_strategy: MergeStrategy,
    /// Post-process mode applied to the merged transcript.
    pub postprocess_mode: PostProcessMode,
}

/// Error stored on a failed job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobError {
    /// Machine-readable kind.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

/// How a job run ended short of completion.
#[derive(Debug)]
pub enum JobFailure {
    /// The cancel token was observed.
    Cancelled,
    /// The run failed.
    Failed(JobError),
}

/// Monotonic progress reporter handed to the runner: `(fraction, message)`.
pub type ProgressFn = Arc<dyn Fn(f64, String) + Send + Sync>;

/// The work a queue executes. The server provides the transcription
/// implementation; tests provide instrumented stand-ins.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Process one input to a JSON result, reporting progress and polling
    /// `cancel` at safe points.
    async fn run(
        &self,
        input: JobInput,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<Value, JobFailure>;
}

/// Wire view of one job.
#[derive(Clone, Debug, Serialize)]
pub struct JobInfo {
    /// Job ID.
    pub job_id: String,
    /// Current state.
    pub status: JobState,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// When a worker picked it up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When it reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Fraction complete in `[0.0, 1.0]`.
    pub progress: f64,
    /// Last progress message.
    pub progress_message: String,
    /// Result payload, only when `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error, only when `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    /// Uploaded filename, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Uploaded audio duration in seconds.
    pub duration_seconds: f64,
}

/// Aggregate queue counters.
#[derive(Clone, Debug, Default, Serialize)]
pub struct JobStats {
    /// Jobs currently held, any state.
    pub total_jobs: usize,
    /// Per-state counts.
    pub pending: usize,
    /// Jobs being processed right now.
    pub processing: usize,
    /// Completed jobs still held.
    pub completed: usize,
    /// Failed jobs still held.
    pub failed: usize,
    /// Cancelled jobs still held.
    pub cancelled: usize,
    /// Configured concurrency.
    pub max_concurrent_jobs: usize,
}
