//! Short-time energy over PCM, used by voice-activity segmentation.

use crate::pcm::SAMPLE_RATE;

/// Analysis frame length (25 ms at the canonical rate).
pub const FRAME_SAMPLES: usize = (SAMPLE_RATE as usize * 25) / 1000;
/// Hop between frames (10 ms).
pub const HOP_SAMPLES: usize = (SAMPLE_RATE as usize * 10) / 1000;

/// RMS of a sample block, normalized to full scale (0.0–1.0).
#[must_use]
pub fn rms(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_squares: i64 = frame
        .iter()
        .map(|&sample| {
            let s = i64::from(sample);
            s * s
        })
        .sum();
    let mean_square = sum_squares as f64 / frame.len() as f64;
    (mean_square.sqrt() / 32768.0) as f32
}

/// Sliding-window RMS envelope (25 ms frames, 10 ms hop).
///
/// Entry `i` covers samples starting at `i * HOP_SAMPLES`. A trailing
/// partial frame contributes its own RMS so the envelope always covers the
/// whole buffer.
#[must_use]
pub fn envelope(samples: &[i16]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(samples.len() / HOP_SAMPLES + 1);
    let mut start = 0;
    while start < samples.len() {
        let end = (start + FRAME_SAMPLES).min(samples.len());
        out.push(rms(&samples[start..end]));
        start += HOP_SAMPLES;
    }
    out
}

/// First sample covered by envelope frame `i`.
#[must_use]
pub fn frame_start_sample(frame_index: usize) -> usize {
    frame_index * HOP_SAMPLES
}
