//! The shared transcription service used by routes, the WebSocket stream,
//! and the job runner: segment → recognize → merge → post-process.

use std::sync::Arc;

use murmur_core::Language;
use murmur_pipeline::{MergeStrategy, PipelineError, PipelineOptions, PipelineOutput, ProgressSink};
use murmur_recognize::RecognizerAdapter;
use murmur_segment::{segment, SegmentStrategy, SegmenterConfig};
use murmur_text::processor::ProcessRequest;
use murmur_text::{AppCategory, Enhancer, PersonalDictionary, PostProcessMode, ProcessOutcome, TextProcessor};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Runtime-mutable post-processing defaults (the `/api/postprocess/config`
/// surface).
#[derive(Clone, Debug)]
pub struct PostProcessDefaults {
    /// Mode applied when a request does not name one.
    pub default_mode: PostProcessMode,
}

impl Default for PostProcessDefaults {
    fn default() -> Self {
        Self {
            default_mode: PostProcessMode::Standard,
        }
    }
}

/// Per-request pipeline knobs.
#[derive(Clone, Debug)]
pub struct TranscribeOptions {
    /// Segmentation strategy.
    pub strategy: SegmentStrategy,
    /// Merge strategy.
    pub merge_strategy: MergeStrategy,
    /// Language hint.
    pub language: Language,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            strategy: SegmentStrategy::Hybrid,
            merge_strategy: MergeStrategy::Simple,
            language: Language::Auto,
        }
    }
}

/// Cheap-to-clone bundle of the process-wide singletons.
#[derive(Clone)]
pub struct TranscriptionService {
    /// The serializing recognizer front.
    pub recognizer: Arc<RecognizerAdapter>,
    /// Segmenter tuning shared by every request.
    pub segmenter: Arc<SegmenterConfig>,
    /// The personal dictionary, mutated through admin endpoints.
    pub dictionary: Arc<PersonalDictionary>,
    /// Optional LLM enhancer.
    pub enhancer: Option<Arc<dyn Enhancer>>,
    /// In-flight recognition width per pipeline invocation.
    pub pipeline_concurrency: usize,
    processor: Arc<RwLock<Arc<TextProcessor>>>,
    defaults: Arc<RwLock<PostProcessDefaults>>,
}

impl TranscriptionService {
    /// Assemble the service around its singletons.
    #[must_use]
    pub fn new(
        recognizer: Arc<RecognizerAdapter>,
        segmenter: SegmenterConfig,
        dictionary: Arc<PersonalDictionary>,
        enhancer: Option<Arc<dyn Enhancer>>,
        pipeline_concurrency: usize,
    ) -> Self {
        let processor = Arc::new(TextProcessor::new(dictionary.clone()));
        Self {
            recognizer,
            segmenter: Arc::new(segmenter),
            dictionary,
            enhancer,
            pipeline_concurrency,
            processor: Arc::new(RwLock::new(processor)),
            defaults: Arc::new(RwLock::new(PostProcessDefaults::default())),
        }
    }

    /// Current text processor.
    #[must_use]
    pub fn processor(&self) -> Arc<TextProcessor> {
        self.processor.read().clone()
    }

    /// Replace the filler / correction rule sets, keeping the dictionary.
    pub fn set_rules(&self, fillers: Option<Vec<String>>, corrections: Option<Vec<String>>) {
        let current = self.processor();
        let fillers = fillers.unwrap_or_else(|| current.fillers().to_vec());
        let corrections = corrections.unwrap_or_else(|| current.correction_cues().to_vec());
        let rebuilt = Arc::new(TextProcessor::with_rules(
            self.dictionary.clone(),
            fillers,
            corrections,
        ));
        *self.processor.write() = rebuilt;
    }

    /// Default post-process mode.
    #[must_use]
    pub fn default_mode(&self) -> PostProcessMode {
        self.defaults.read().default_mode
    }

    /// Set the default post-process mode.
    pub fn set_default_mode(&self, mode: PostProcessMode) {
        self.defaults.write().default_mode = mode;
    }

    /// Segment and transcribe one buffer.
    #[instrument(skip_all, fields(samples = samples.len(), strategy = opts.strategy.as_str()))]
    pub async fn transcribe(
        &self,
        samples: Vec<i16>,
        opts: &TranscribeOptions,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let segments = segment(&samples, opts.strategy, &self.segmenter);
        metrics::counter!(crate::metrics::ASR_SEGMENTS_TOTAL).increment(segments.len() as u64);

        let started = std::time::Instant::now();
        let output = murmur_pipeline::run(
            self.recognizer.clone(),
            Arc::new(samples),
            segments,
            PipelineOptions {
                language: opts.language.clone(),
                merge_strategy: opts.merge_strategy,
                concurrency: self.pipeline_concurrency,
            },
            progress,
            cancel,
        )
        .await?;
        metrics::histogram!(crate::metrics::ASR_PIPELINE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(output)
    }

    /// Post-process a merged transcript for the given app category.
    pub async fn postprocess(
        &self,
        text: &str,
        mode: PostProcessMode,
        app_hint: Option<&str>,
        paragraph_hints: &[usize],
    ) -> ProcessOutcome {
        let category = app_hint.map_or(AppCategory::General, AppCategory::from_app_hint);
        let processor = self.processor();
        let request = ProcessRequest {
            text,
            mode,
            profile: category.profile(),
            paragraph_hints,
        };
        processor
            .process_with_enhancer(&request, self.enhancer.as_deref(), category.as_str())
            .await
    }
}
