//! Recognizer capability contract.

use std::path::Path;

use async_trait::async_trait;
use murmur_core::Language;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One word with timing, passed through opaquely when the model emits it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    /// The word text.
    pub word: String,
    /// Start offset in milliseconds from the segment start.
    pub start_ms: u64,
    /// End offset in milliseconds from the segment start.
    pub end_ms: u64,
}

/// Output of one recognizer invocation.
///
/// `text` is authoritative; the richer fields are optional and flow through
/// to clients untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    /// Transcribed text (may be empty for silence).
    pub text: String,
    /// Detected language, if the model reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Speaker label, if the model diarizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Per-word timings, if the model emits them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTiming>>,
}

/// Errors a recognizer backend can produce.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// Model failed to load or warm up.
    #[error("model init failed: {0}")]
    InitFailed(String),

    /// A single inference call failed.
    #[error("model inference failed: {0}")]
    InferenceFailed(String),

    /// The model cannot handle the requested language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// One shaped inference request handed to the backend.
pub struct RecognizerRequest<'a> {
    /// Normalized mono samples in ±1.0 at 16 kHz.
    pub samples: &'a [f32],
    /// Materialized WAV path, present only when the backend asked for file
    /// input via [`Recognizer::wants_file_input`].
    pub wav_path: Option<&'a Path>,
    /// Language hint.
    pub language: &'a Language,
}

/// The recognizer capability.
///
/// Implementations map PCM to text. The adapter owns shaping, locking, and
/// retries; backends only run inference.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Human-readable backend name for logs and `/version`.
    fn name(&self) -> &str;

    /// Load model state. Called once by the adapter before the first
    /// inference; the default is a no-op for stateless backends.
    async fn init(&self) -> Result<(), RecognizerError> {
        Ok(())
    }

    /// Transcribe one shaped request.
    async fn recognize(&self, req: RecognizerRequest<'_>) -> Result<Recognition, RecognizerError>;

    /// Whether concurrent inference calls are safe. Non-re-entrant backends
    /// are serialized behind a mutex by the adapter.
    fn reentrant(&self) -> bool {
        false
    }

    /// Whether the backend needs a WAV file on disk instead of in-memory
    /// samples.
    fn wants_file_input(&self) -> bool {
        false
    }
}
