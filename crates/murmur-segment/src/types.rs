//! Segment and strategy types.

use std::str::FromStr;

use murmur_audio::SAMPLE_RATE;
use murmur_core::ServiceError;
use serde::{Deserialize, Serialize};

/// Chunking strategy selected per request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStrategy {
    /// Equal-length chunks with overlap.
    Fixed,
    /// Speech regions between silences.
    Vad,
    /// VAD, then fixed re-split of over-long regions.
    #[default]
    Hybrid,
}

impl FromStr for SegmentStrategy {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "vad" => Ok(Self::Vad),
            "hybrid" | "" => Ok(Self::Hybrid),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown strategy: {other:?}"
            ))),
        }
    }
}

impl SegmentStrategy {
    /// Wire name of the strategy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Vad => "vad",
            Self::Hybrid => "hybrid",
        }
    }
}

/// A contiguous slice of one audio buffer, `[start_sample, end_sample)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Dense 0-based index in emission order.
    pub index: usize,
    /// First sample (inclusive).
    pub start_sample: usize,
    /// One past the last sample.
    pub end_sample: usize,
    /// Samples shared with the previous segment, when the strategy produced
    /// overlap. Zero otherwise.
    pub overlap_with_prev: usize,
}

impl Segment {
    /// Number of samples covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_sample - self.start_sample
    }

    /// Whether the segment covers no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end_sample == self.start_sample
    }

    /// Duration in seconds at the canonical rate.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / f64::from(SAMPLE_RATE)
    }
}
