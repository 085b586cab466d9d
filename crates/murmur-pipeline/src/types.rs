//! Pipeline data types.

use std::str::FromStr;

use murmur_core::ServiceError;
use serde::{Deserialize, Serialize};

/// How per-segment texts combine into the final transcript.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Concatenate with single spaces.
    #[default]
    Simple,
    /// Deduplicate the overlap window between consecutive segments.
    Overlap,
    /// `overlap` + sentence/paragraph handling at long silences.
    Smart,
}

impl FromStr for MergeStrategy {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" | "" => Ok(Self::Simple),
            "overlap" => Ok(Self::Overlap),
            "smart" => Ok(Self::Smart),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown merge_strategy: {other:?}"
            ))),
        }
    }
}

impl MergeStrategy {
    /// Wire name of the strategy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Overlap => "overlap",
            Self::Smart => "smart",
        }
    }
}

/// One segment's recognition result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentTranscript {
    /// Segment index (dense, 0-based).
    pub index: usize,
    /// First sample of the segment in the source buffer.
    pub start_sample: usize,
    /// One past the last sample.
    pub end_sample: usize,
    /// Samples shared with the previous segment.
    pub overlap_with_prev: usize,
    /// Recognized text; empty when the segment failed or was silent.
    pub text: String,
    /// Language reported by the recognizer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Speaker label, passed through opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Error annotation when recognition failed for this segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Merge bookkeeping returned with the final transcript.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MergeStats {
    /// Segments processed.
    pub segments: usize,
    /// Segments that failed recognition.
    pub failed_segments: usize,
    /// Strategy applied.
    pub merge_strategy: String,
    /// Words dropped from overlap windows.
    pub overlap_words_dropped: usize,
    /// Paragraph breaks inserted by `smart` merging.
    pub paragraph_breaks: usize,
}

/// Full pipeline result.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutput {
    /// Merged transcript.
    pub final_transcript: String,
    /// Per-segment results in index order.
    pub per_segment: Vec<SegmentTranscript>,
    /// Merge bookkeeping.
    pub merge_stats: MergeStats,
    /// Byte offsets into `final_transcript` where silences longer than the
    /// paragraph threshold separate segments. Consumed by the
    /// post-processor's paragraphing step.
    pub paragraph_hints: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_strategy_parse() {
        assert_eq!("simple".parse::<MergeStrategy>().unwrap(), MergeStrategy::Simple);
        assert_eq!("overlap".parse::<MergeStrategy>().unwrap(), MergeStrategy::Overlap);
        assert_eq!("smart".parse::<MergeStrategy>().unwrap(), MergeStrategy::Smart);
        assert_eq!("".parse::<MergeStrategy>().unwrap(), MergeStrategy::Simple);
        assert!("clever".parse::<MergeStrategy>().is_err());
    }

    #[test]
    fn segment_transcript_omits_empty_options() {
        let st = SegmentTranscript {
            index: 0,
            start_sample: 0,
            end_sample: 16_000,
            overlap_with_prev: 0,
            text: "hi".into(),
            language: None,
            speaker: None,
            error: None,
        };
        let json = serde_json::to_string(&st).unwrap();
        assert!(!json.contains("error"));
        assert!(!json.contains("speaker"));
    }
}
