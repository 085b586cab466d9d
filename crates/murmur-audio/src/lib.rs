//! # murmur-audio
//!
//! Audio plumbing for the murmur service.
//!
//! # Canonical format
//!
//! ```text
//! wire bytes (LE i16 PCM, or WAV/MP3/M4A/FLAC/OGG/AAC container)
//! → symphonia decode → mono mixdown → rubato resample
//! → 16 kHz mono i16 (canonical) → f32 ±1.0 for the recognizer
//! ```
//!
//! Everything downstream of this crate assumes canonical PCM.

#![deny(unsafe_code)]

pub mod decode;
pub mod energy;
pub mod pcm;
pub mod wav;

pub use decode::{decode_container, is_riff, DecodedAudio};
pub use pcm::{AudioError, AudioFrame, SAMPLE_RATE};
