//! Ordered, failure-isolated recognition over a segment list.

use std::collections::BTreeMap;
use std::sync::Arc;

use murmur_core::Language;
use murmur_recognize::RecognizerAdapter;
use murmur_segment::Segment;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::merge::merge;
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::types::{MergeStats, MergeStrategy, PipelineOutput, SegmentTranscript};

/// Per-invocation options.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// Language hint forwarded to the recognizer.
    pub language: Language,
    /// Merge strategy for the final transcript.
    pub merge_strategy: MergeStrategy,
    /// In-flight recognition width. 1 is always correct; 2–3 only help when
    /// the recognizer is re-entrant.
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            language: Language::Auto,
            merge_strategy: MergeStrategy::Simple,
            concurrency: 1,
        }
    }
}

/// Failures of a whole pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The cancel flag was observed between segments.
    #[error("pipeline cancelled")]
    Cancelled,

    /// Every segment failed, so there is nothing to merge.
    #[error("{0}")]
    RecognizerFailed(String),
}

/// Run the recognizer over every segment and merge the results.
///
/// Segments recognize under a bounded in-flight window; completions buffer
/// and emit strictly in index order, with one progress report per emission.
/// A failing segment contributes empty text with an error annotation.
#[instrument(skip_all, fields(segments = segments.len(), width = opts.concurrency))]
pub async fn run(
    adapter: Arc<RecognizerAdapter>,
    samples: Arc<Vec<i16>>,
    segments: Vec<Segment>,
    opts: PipelineOptions,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) -> Result<PipelineOutput, PipelineError> {
    let total = segments.len();
    if total == 0 {
        return Ok(PipelineOutput {
            final_transcript: String::new(),
            per_segment: Vec::new(),
            merge_stats: MergeStats {
                merge_strategy: opts.merge_strategy.as_str().to_owned(),
                ..MergeStats::default()
            },
            paragraph_hints: Vec::new(),
        });
    }

    let width = opts.concurrency.max(1);
    let mut in_flight: JoinSet<(usize, Result<murmur_recognize::Recognition, _>)> = JoinSet::new();
    let mut buffered: BTreeMap<usize, SegmentTranscript> = BTreeMap::new();
    let mut emitted: Vec<SegmentTranscript> = Vec::with_capacity(total);
    let mut next_spawn = 0usize;
    let mut failed = 0usize;

    while emitted.len() < total {
        // Cooperative cancellation between segments. In-flight recognitions
        // finish detached; their results are discarded.
        if cancel.is_cancelled() {
            debug!(emitted = emitted.len(), total, "pipeline observed cancel flag");
            in_flight.detach_all();
            return Err(PipelineError::Cancelled);
        }

        while in_flight.len() < width && next_spawn < total {
            let seg = segments[next_spawn];
            let adapter = Arc::clone(&adapter);
            let samples = Arc::clone(&samples);
            let language = opts.language.clone();
            let _handle = in_flight.spawn(async move {
                let end = seg.end_sample.min(samples.len());
                let start = seg.start_sample.min(end);
                let result = adapter.recognize(&samples[start..end], &language).await;
                (seg.index, result)
            });
            next_spawn += 1;
        }

        let Some(joined) = in_flight.join_next().await else {
            break;
        };
        let (index, result) = joined
            .map_err(|e| PipelineError::RecognizerFailed(format!("recognition task: {e}")))?;

        let seg = segments[index];
        let transcript = match result {
            Ok(recognition) => SegmentTranscript {
                index,
                start_sample: seg.start_sample,
                end_sample: seg.end_sample,
                overlap_with_prev: seg.overlap_with_prev,
                text: recognition.text,
                language: recognition.language,
                speaker: recognition.speaker,
                error: None,
            },
            Err(e) => {
                warn!(segment = index, error = %e, "segment recognition failed, continuing");
                failed += 1;
                SegmentTranscript {
                    index,
                    start_sample: seg.start_sample,
                    end_sample: seg.end_sample,
                    overlap_with_prev: seg.overlap_with_prev,
                    text: String::new(),
                    language: None,
                    speaker: None,
                    error: Some(e.to_string()),
                }
            }
        };
        let _ = buffered.insert(index, transcript);

        // Emit every segment that is now contiguous with what went out.
        while let Some(transcript) = buffered.remove(&emitted.len()) {
            let segment_text = transcript.text.clone();
            emitted.push(transcript);
            let partial = merge(&emitted, opts.merge_strategy);
            progress
                .report(ProgressUpdate {
                    current: emitted.len(),
                    total,
                    message: format!("segment {}/{} complete", emitted.len(), total),
                    partial_text: partial.text,
                    segment_text,
                })
                .await;
        }
    }

    if failed == total {
        return Err(PipelineError::RecognizerFailed(format!(
            "all {total} segments failed"
        )));
    }

    let outcome = merge(&emitted, opts.merge_strategy);
    Ok(PipelineOutput {
        final_transcript: outcome.text,
        per_segment: emitted,
        merge_stats: MergeStats {
            segments: total,
            failed_segments: failed,
            merge_strategy: opts.merge_strategy.as_str().to_owned(),
            overlap_words_dropped: outcome.overlap_words_dropped,
            paragraph_breaks: outcome.paragraph_breaks,
        },
        paragraph_hints: outcome.paragraph_hints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{FnSink, NullSink};
    use murmur_recognize::{AdapterConfig, MockRecognizer};
    use parking_lot::Mutex;

    fn adapter_for(mock: MockRecognizer) -> Arc<RecognizerAdapter> {
        RecognizerAdapter::new(
            Arc::new(mock),
            AdapterConfig {
                retry_delay_ms: 1,
                ..AdapterConfig::default()
            },
        )
    }

    fn seg(index: usize, start: usize, end: usize) -> Segment {
        Segment {
            index,
            start_sample: start,
            end_sample: end,
            overlap_with_prev: 0,
        }
    }

    fn speech(samples: usize) -> Vec<i16> {
        (0..samples)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * 200.0 * i as f32 / 16_000.0;
                (phase.sin() * 8000.0) as i16
            })
            .collect()
    }

    #[tokio::test]
    async fn happy_path_merges_in_order() {
        let adapter = adapter_for(MockRecognizer::scripted(vec![
            "alpha".into(),
            "beta".into(),
            "gamma".into(),
        ]));
        let samples = Arc::new(speech(48_000));
        let segments = vec![seg(0, 0, 16_000), seg(1, 16_000, 32_000), seg(2, 32_000, 48_000)];

        let out = run(
            adapter,
            samples,
            segments,
            PipelineOptions::default(),
            Arc::new(NullSink),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.final_transcript, "alpha beta gamma");
        assert_eq!(out.per_segment.len(), 3);
        assert_eq!(out.merge_stats.segments, 3);
        assert_eq!(out.merge_stats.failed_segments, 0);
        for (i, st) in out.per_segment.iter().enumerate() {
            assert_eq!(st.index, i);
        }
    }

    #[tokio::test]
    async fn partial_failure_is_isolated() {
        // Segment 1 fails both attempts (the adapter retries once), so the
        // mock must fail calls 1 and 2.
        // The scripted queue only pops on successful calls, so two texts
        // cover segments 0 and 2.
        let adapter = adapter_for(
            MockRecognizer::scripted(vec!["before".into(), "after".into()]).failing_calls([1, 2]),
        );
        let samples = Arc::new(speech(48_000));
        let segments = vec![seg(0, 0, 16_000), seg(1, 16_000, 32_000), seg(2, 32_000, 48_000)];

        let out = run(
            adapter,
            samples,
            segments,
            PipelineOptions::default(),
            Arc::new(NullSink),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.final_transcript, "before after");
        assert_eq!(out.merge_stats.failed_segments, 1);
        assert!(out.per_segment[1].text.is_empty());
        assert!(out.per_segment[1].error.is_some());
        assert!(out.per_segment[0].error.is_none());
        assert!(out.per_segment[2].error.is_none());
    }

    #[tokio::test]
    async fn all_segments_failing_fails_invocation() {
        // 2 segments × 2 attempts each.
        let adapter = adapter_for(MockRecognizer::new().failing_calls([0, 1, 2, 3]));
        let samples = Arc::new(speech(32_000));
        let segments = vec![seg(0, 0, 16_000), seg(1, 16_000, 32_000)];

        let err = run(
            adapter,
            samples,
            segments,
            PipelineOptions::default(),
            Arc::new(NullSink),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::RecognizerFailed(_)));
    }

    #[tokio::test]
    async fn cancel_before_start_returns_cancelled() {
        let adapter = adapter_for(MockRecognizer::new());
        let samples = Arc::new(speech(32_000));
        let segments = vec![seg(0, 0, 16_000), seg(1, 16_000, 32_000)];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run(
            adapter,
            samples,
            segments,
            PipelineOptions::default(),
            Arc::new(NullSink),
            cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[tokio::test]
    async fn progress_reports_are_ordered_and_complete() {
        let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_updates = updates.clone();
        let sink = FnSink(move |u: ProgressUpdate| {
            sink_updates.lock().push(u);
        });

        let adapter = adapter_for(MockRecognizer::scripted(vec![
            "one".into(),
            "two".into(),
            "three".into(),
        ]));
        let samples = Arc::new(speech(48_000));
        let segments = vec![seg(0, 0, 16_000), seg(1, 16_000, 32_000), seg(2, 32_000, 48_000)];

        let _ = run(
            adapter,
            samples,
            segments,
            PipelineOptions::default(),
            Arc::new(sink),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let updates = updates.lock();
        assert_eq!(updates.len(), 3);
        for (i, u) in updates.iter().enumerate() {
            assert_eq!(u.current, i + 1);
            assert_eq!(u.total, 3);
        }
        assert_eq!(updates[0].partial_text, "one");
        assert_eq!(updates[1].partial_text, "one two");
        assert_eq!(updates[2].partial_text, "one two three");
    }

    #[tokio::test]
    async fn pipelined_width_preserves_order() {
        // A re-entrant mock with width 2: internal completion order may
        // vary, emission order must not.
        let adapter = adapter_for(MockRecognizer::new().reentrant());
        let samples = Arc::new(speech(96_000));
        let segments: Vec<Segment> = (0..6)
            .map(|i| seg(i, i * 16_000, (i + 1) * 16_000))
            .collect();

        let out = run(
            adapter,
            samples,
            segments,
            PipelineOptions {
                concurrency: 2,
                ..PipelineOptions::default()
            },
            Arc::new(NullSink),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.per_segment.len(), 6);
        for (i, st) in out.per_segment.iter().enumerate() {
            assert_eq!(st.index, i);
        }
    }

    #[tokio::test]
    async fn empty_segment_list_is_empty_output() {
        let adapter = adapter_for(MockRecognizer::new());
        let out = run(
            adapter,
            Arc::new(Vec::new()),
            Vec::new(),
            PipelineOptions::default(),
            Arc::new(NullSink),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(out.final_transcript, "");
        assert!(out.per_segment.is_empty());
    }
}
