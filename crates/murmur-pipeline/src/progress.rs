//! Progress reporting from the orchestrator to interested parties.

use async_trait::async_trait;
use serde::Serialize;

/// One progress report, sent after each ordered segment emission.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressUpdate {
    /// Segments completed so far (1-based).
    pub current: usize,
    /// Total segments in this invocation.
    pub total: usize,
    /// Human-readable status line.
    pub message: String,
    /// Running merged transcript up to this segment.
    pub partial_text: String,
    /// Text of just the completed segment.
    pub segment_text: String,
}

/// Receives progress updates.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Handle one update. Implementations should be fast; the orchestrator
    /// awaits this between segments.
    async fn report(&self, update: ProgressUpdate);
}

/// Discards all updates.
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn report(&self, _update: ProgressUpdate) {}
}

/// Adapts a plain closure into a sink (used by the job queue).
pub struct FnSink<F: Fn(ProgressUpdate) + Send + Sync>(pub F);

#[async_trait]
impl<F: Fn(ProgressUpdate) + Send + Sync> ProgressSink for FnSink<F> {
    async fn report(&self, update: ProgressUpdate) {
        (self.0)(update);
    }
}
