//! Canonical PCM frames and byte-level validation.

use std::sync::Arc;

use thiserror::Error;

/// Canonical sample rate for everything downstream of ingest.
pub const SAMPLE_RATE: u32 = 16_000;

/// Errors produced while handling raw audio bytes.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Byte count is not a whole number of 16-bit samples.
    #[error("PCM byte count {0} is not a multiple of 2")]
    OddByteCount(usize),

    /// Container probe or decode failure.
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Resampling failure.
    #[error("resample error: {0}")]
    Resample(String),

    /// WAV read/write failure.
    #[error("wav error: {0}")]
    Wav(String),

    /// File I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An immutable block of canonical PCM (16-bit signed, mono, 16 kHz).
///
/// Frames are created on ingest and never mutated; a session accumulates an
/// ordered sequence of them. Cloning is cheap (shared backing storage).
#[derive(Clone, Debug)]
pub struct AudioFrame {
    samples: Arc<[i16]>,
}

impl AudioFrame {
    /// Build a frame from little-endian PCM bytes.
    ///
    /// Fails when the byte count is not a multiple of 2.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        if bytes.len() % 2 != 0 {
            return Err(AudioError::OddByteCount(bytes.len()));
        }
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self {
            samples: samples.into(),
        })
    }

    /// Build a frame from already-decoded samples.
    #[must_use]
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// Samples in this frame.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of the frame at the canonical rate.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(SAMPLE_RATE)
    }
}

/// Concatenate an ordered sequence of frames into one contiguous buffer.
#[must_use]
pub fn concat_frames(frames: &[AudioFrame]) -> Vec<i16> {
    let total: usize = frames.iter().map(AudioFrame::len).sum();
    let mut out = Vec::with_capacity(total);
    for frame in frames {
        out.extend_from_slice(frame.samples());
    }
    out
}

/// Convert canonical i16 samples to normalized f32 in ±1.0.
#[must_use]
pub fn samples_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| f32::from(s) / 32768.0).collect()
}

/// Duration of a sample count at the canonical rate.
#[must_use]
pub fn duration_secs(sample_count: usize) -> f64 {
    sample_count as f64 / f64::from(SAMPLE_RATE)
}
