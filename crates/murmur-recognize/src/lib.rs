//! # murmur-recognize
//!
//! The recognizer capability boundary. The service never talks to a model
//! directly; it talks to [`RecognizerAdapter`], which fronts any
//! [`Recognizer`] implementation with:
//!
//! - lazy initialization with optional background warm-up
//! - request serialization when the model is not re-entrant
//! - canonical input shaping (i16 PCM → f32 ±1.0) and WAV temp-file
//!   materialization for models that want file input
//! - a single retry with backoff on inference failure
//!
//! [`MockRecognizer`] is the built-in deterministic backend used by tests
//! and by deployments without a model: it reports silence as an empty
//! transcript and synthesizes stable text for speech.

#![deny(unsafe_code)]

mod adapter;
mod mock;
mod types;

pub use adapter::{AdapterConfig, RecognizerAdapter};
pub use mock::MockRecognizer;
pub use types::{Recognition, Recognizer, RecognizerError, RecognizerRequest, WordTiming};
