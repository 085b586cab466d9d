//! Segmenter tuning knobs.

use murmur_audio::SAMPLE_RATE;
use serde::{Deserialize, Serialize};

/// Configuration for all three strategies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Fixed-strategy chunk length in seconds.
    pub chunk_duration: f32,
    /// Overlap between consecutive fixed chunks in seconds.
    pub overlap: f32,
    /// Full-scale RMS below which a frame counts as silence.
    pub silence_threshold: f32,
    /// Minimum silence run that splits speech, in seconds.
    pub min_silence_duration: f32,
    /// Padding added around detected speech, in milliseconds.
    pub pad_ms: u32,
    /// Hybrid: regions longer than this are re-split. Kept at 20 s so each
    /// piece stays inside the recognizer context window.
    pub max_chunk_duration: f32,
    /// Hybrid: lower bound of the preferred segment length band, seconds.
    pub min_seg: f32,
    /// Hybrid: upper bound of the preferred segment length band, seconds.
    pub max_seg: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_duration: 30.0,
            overlap: 2.0,
            silence_threshold: 0.01,
            min_silence_duration: 0.5,
            pad_ms: 100,
            max_chunk_duration: 20.0,
            min_seg: 8.0,
            max_seg: 20.0,
        }
    }
}

impl SegmenterConfig {
    pub(crate) fn chunk_samples(&self) -> usize {
        (self.chunk_duration * SAMPLE_RATE as f32) as usize
    }

    pub(crate) fn overlap_samples(&self) -> usize {
        (self.overlap * SAMPLE_RATE as f32) as usize
    }

    pub(crate) fn min_silence_frames(&self) -> usize {
        // Envelope hop is 10 ms.
        ((self.min_silence_duration * 100.0) as usize).max(1)
    }

    pub(crate) fn pad_samples(&self) -> usize {
        (self.pad_ms as usize * SAMPLE_RATE as usize) / 1000
    }

    pub(crate) fn max_chunk_samples(&self) -> usize {
        (self.max_chunk_duration * SAMPLE_RATE as f32) as usize
    }

    pub(crate) fn min_seg_samples(&self) -> usize {
        (self.min_seg * SAMPLE_RATE as f32) as usize
    }

    pub(crate) fn max_seg_samples(&self) -> usize {
        (self.max_seg * SAMPLE_RATE as f32) as usize
    }
}
