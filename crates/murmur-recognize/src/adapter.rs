//! Serializing, retrying front for any [`Recognizer`] backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use murmur_audio::pcm::samples_to_f32;
use murmur_audio::wav;
use murmur_core::retry::{backoff_delay_ms, RECOGNIZER_RETRY_DELAY_MS};
use murmur_core::Language;
use tokio::sync::{Mutex, OnceCell, Semaphore};
use tracing::{debug, info, instrument, warn};

use crate::types::{Recognition, Recognizer, RecognizerError, RecognizerRequest};

/// Adapter tuning.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Inference width for re-entrant backends. Non-re-entrant backends are
    /// always serialized regardless of this value.
    pub concurrency: usize,
    /// Directory for temp WAVs when the backend wants file input.
    pub tmp_dir: PathBuf,
    /// Delay before the single inference retry.
    pub retry_delay_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            tmp_dir: PathBuf::from("runtime/tmp"),
            retry_delay_ms: RECOGNIZER_RETRY_DELAY_MS,
        }
    }
}

/// Serialization gate in front of the backend.
enum Gate {
    /// Non-re-entrant model: one inference at a time.
    Exclusive(Mutex<()>),
    /// Re-entrant model: bounded width.
    Shared(Semaphore),
}

/// Fronts a recognizer backend with init, shaping, locking, and retry.
pub struct RecognizerAdapter {
    backend: Arc<dyn Recognizer>,
    gate: Gate,
    init: OnceCell<()>,
    config: AdapterConfig,
}

impl RecognizerAdapter {
    /// Wrap a backend. The gate is chosen from the backend's declared
    /// re-entrancy.
    pub fn new(backend: Arc<dyn Recognizer>, config: AdapterConfig) -> Arc<Self> {
        let gate = if backend.reentrant() {
            Gate::Shared(Semaphore::new(config.concurrency.max(1)))
        } else {
            Gate::Exclusive(Mutex::new(()))
        };
        Arc::new(Self {
            backend,
            gate,
            init: OnceCell::new(),
            config,
        })
    }

    /// Backend name for logs and `/version`.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Whether the model has completed initialization.
    pub fn is_ready(&self) -> bool {
        self.init.initialized()
    }

    /// Initialize the model now, propagating failure.
    ///
    /// A failed attempt leaves the cell empty, so a later call retries.
    pub async fn init_now(&self) -> Result<(), RecognizerError> {
        self.init
            .get_or_try_init(|| async {
                info!(backend = self.backend.name(), "initializing recognizer");
                self.backend.init().await
            })
            .await
            .map(|_| ())
    }

    /// Kick off initialization in the background so first-use cost stays out
    /// of request latency. Errors are logged; the first request will retry.
    pub fn warmup(self: &Arc<Self>) {
        let adapter = Arc::clone(self);
        drop(tokio::spawn(async move {
            if let Err(e) = adapter.init_now().await {
                warn!(error = %e, "background recognizer warm-up failed");
            } else {
                info!(backend = adapter.backend_name(), "recognizer warm-up complete");
            }
        }));
    }

    /// Transcribe canonical PCM.
    ///
    /// Shapes the input, serializes access per the backend's re-entrancy,
    /// and retries a failed inference once after a short backoff.
    #[instrument(skip_all, fields(backend = self.backend.name(), samples = samples.len()))]
    pub async fn recognize(
        &self,
        samples: &[i16],
        language: &Language,
    ) -> Result<Recognition, RecognizerError> {
        self.init_now().await?;

        let shaped = samples_to_f32(samples);

        // Materialize a temp WAV only when the backend asked for file input.
        // The handle keeps the file alive until the call finishes.
        let temp_wav = if self.backend.wants_file_input() {
            let pcm = samples.to_vec();
            let dir = self.config.tmp_dir.clone();
            let file = tokio::task::spawn_blocking(move || wav::write_temp_wav(&pcm, &dir))
                .await
                .map_err(|e| RecognizerError::InferenceFailed(format!("wav task join: {e}")))?
                .map_err(|e| RecognizerError::InferenceFailed(format!("wav materialize: {e}")))?;
            Some(file)
        } else {
            None
        };

        let _permit;
        let _guard;
        match &self.gate {
            Gate::Exclusive(mutex) => {
                _guard = Some(mutex.lock().await);
                _permit = None;
            }
            Gate::Shared(sem) => {
                _permit = Some(
                    sem.acquire()
                        .await
                        .map_err(|_| RecognizerError::InferenceFailed("gate closed".into()))?,
                );
                _guard = None;
            }
        }

        let request = || RecognizerRequest {
            samples: &shaped,
            wav_path: temp_wav.as_ref().map(|f| f.path()),
            language,
        };

        match self.backend.recognize(request()).await {
            Ok(recognition) => Ok(recognition),
            Err(RecognizerError::InferenceFailed(first)) => {
                debug!(error = %first, "inference failed, retrying once");
                let delay = backoff_delay_ms(0, self.config.retry_delay_ms, 10_000);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                self.backend.recognize(request()).await.map_err(|second| {
                    warn!(first = %first, error = %second, "inference retry failed");
                    second
                })
            }
            Err(other) => Err(other),
        }
    }
}
