//! The job queue's transcription runner.

use std::sync::Arc;

use async_trait::async_trait;
use murmur_audio::pcm::duration_secs;
use murmur_jobs::{JobError, JobFailure, JobInput, JobRunner, ProgressFn};
use murmur_pipeline::{FnSink, PipelineError, ProgressUpdate};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::service::{TranscribeOptions, TranscriptionService};

/// Runs queued uploads through the shared transcription service.
pub struct TranscribeRunner {
    svc: TranscriptionService,
}

impl TranscribeRunner {
    /// Runner over the given service.
    #[must_use]
    pub fn new(svc: TranscriptionService) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl JobRunner for TranscribeRunner {
    #[instrument(skip_all, fields(samples = input.samples.len()))]
    async fn run(
        &self,
        input: JobInput,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<Value, JobFailure> {
        let duration = duration_secs(input.samples.len());
        let opts = TranscribeOptions {
            strategy: input.strategy,
            merge_strategy: input.merge_strategy,
            language: input.language.clone(),
        };

        let sink_progress = Arc::clone(&progress);
        let sink = FnSink(move |update: ProgressUpdate| {
            let fraction = update.current as f64 / update.total.max(1) as f64;
            sink_progress(fraction, update.message);
        });

        let output = self
            .svc
            .transcribe(input.samples, &opts, Arc::new(sink), cancel)
            .await
            .map_err(|e| match e {
                PipelineError::Cancelled => JobFailure::Cancelled,
                PipelineError::RecognizerFailed(message) => JobFailure::Failed(JobError {
                    kind: "RECOGNIZER_FAILED".into(),
                    message,
                }),
            })?;

        progress(0.99, "post-processing".to_owned());
        let processed = self
            .svc
            .postprocess(
                &output.final_transcript,
                input.postprocess_mode,
                None,
                &output.paragraph_hints,
            )
            .await;

        Ok(json!({
            "final_transcript": output.final_transcript,
            "processed_transcript": processed.text,
            "postprocess_stats": processed.stats,
            "merge_stats": output.merge_stats,
            "per_segment": output.per_segment,
            "duration": duration,
            "strategy": opts.strategy.as_str(),
            "merge_strategy": opts.merge_strategy.as_str(),
            "filename": input.filename,
        }))
    }
}
