//! Deterministic in-process recognizer.
//!
//! Stands in for a real model in tests and in deployments without model
//! files. Silence maps to an empty transcript; speech maps to stable
//! synthetic text derived from the input length, so the same audio always
//! produces the same transcript.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use murmur_core::Language;
use parking_lot::Mutex;

use crate::types::{Recognition, Recognizer, RecognizerError, RecognizerRequest};

/// Full-scale RMS below which the mock reports silence.
const SILENCE_RMS: f32 = 0.005;

/// Word pool for synthesized transcripts.
const WORDS: &[&str] = &[
    "the", "quick", "movement", "of", "sound", "carries", "meaning", "across", "every", "pause",
    "and", "phrase", "spoken", "aloud",
];

enum Mode {
    /// Synthesize text from the audio itself.
    Synth,
    /// Return queued texts in call order (empty queue falls back to synth).
    Scripted(Mutex<VecDeque<String>>),
}

/// The built-in deterministic backend.
pub struct MockRecognizer {
    mode: Mode,
    reentrant: bool,
    calls: AtomicUsize,
    fail_calls: Mutex<HashSet<usize>>,
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRecognizer {
    /// Synthesizing mock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::Synth,
            reentrant: false,
            calls: AtomicUsize::new(0),
            fail_calls: Mutex::new(HashSet::new()),
        }
    }

    /// Mock that returns the given texts in call order.
    #[must_use]
    pub fn scripted(texts: Vec<String>) -> Self {
        Self {
            mode: Mode::Scripted(Mutex::new(texts.into())),
            reentrant: false,
            calls: AtomicUsize::new(0),
            fail_calls: Mutex::new(HashSet::new()),
        }
    }

    /// Declare the mock re-entrant (for pipelined-orchestration tests).
    #[must_use]
    pub fn reentrant(mut self) -> Self {
        self.reentrant = true;
        self
    }

    /// Fail the given 0-based call indices with `InferenceFailed`.
    ///
    /// The adapter retries a failed inference once, so failing a segment's
    /// both attempts takes two consecutive indices.
    #[must_use]
    pub fn failing_calls(self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.fail_calls.lock().extend(calls);
        self
    }

    /// Number of inference calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn synthesize(samples: &[f32]) -> String {
        let sum_squares: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        let rms = (sum_squares / samples.len().max(1) as f64).sqrt() as f32;
        if rms < SILENCE_RMS {
            return String::new();
        }

        let duration_secs = samples.len() as f64 / 16_000.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let word_count = ((duration_secs * 2.0).round() as usize).clamp(1, 40);
        let seed = samples.len() % WORDS.len();
        (0..word_count)
            .map(|i| WORDS[(seed + i) % WORDS.len()])
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, req: RecognizerRequest<'_>) -> Result<Recognition, RecognizerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_calls.lock().contains(&call) {
            return Err(RecognizerError::InferenceFailed(format!(
                "injected fault on call {call}"
            )));
        }

        let text = match &self.mode {
            Mode::Synth => Self::synthesize(req.samples),
            Mode::Scripted(queue) => queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Self::synthesize(req.samples)),
        };

        let language = match req.language {
            Language::Auto => Some("en".to_owned()),
            other => Some(other.code().to_owned()),
        };

        Ok(Recognition {
            text,
            language,
            speaker: None,
            words: None,
        })
    }

    fn reentrant(&self) -> bool {
        self.reentrant
    }
}
