//! Merge strategies over per-segment transcripts.

use murmur_audio::SAMPLE_RATE;
use murmur_text::punctuation::terminate_sentence;

use crate::types::{MergeStrategy, SegmentTranscript};

/// Silence between segments that warrants a paragraph break, in samples.
const PARAGRAPH_GAP_SAMPLES: usize = (SAMPLE_RATE as usize * 8) / 10; // 0.8 s

/// Assumed speech rate for sizing the overlap comparison window, words/sec.
const WORDS_PER_SEC: f32 = 3.0;

/// Result of merging.
#[derive(Clone, Debug, Default)]
pub struct MergeOutcome {
    /// Merged text.
    pub text: String,
    /// Words dropped from overlap windows.
    pub overlap_words_dropped: usize,
    /// Paragraph breaks inserted (`smart` only).
    pub paragraph_breaks: usize,
    /// Byte offsets into `text` at boundaries preceded by a qualifying
    /// silence. Produced for every strategy so the post-processor can place
    /// paragraphs even under `simple` merging.
    pub paragraph_hints: Vec<usize>,
}

/// Merge ordered segment transcripts with the chosen strategy.
#[must_use]
pub fn merge(segments: &[SegmentTranscript], strategy: MergeStrategy) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut prev_end_sample: Option<usize> = None;

    for segment in segments {
        let mut incoming = segment.text.trim().to_owned();
        if incoming.is_empty() {
            prev_end_sample = Some(segment.end_sample);
            continue;
        }

        let long_gap = prev_end_sample
            .is_some_and(|prev| segment.start_sample.saturating_sub(prev) > PARAGRAPH_GAP_SAMPLES);

        if matches!(strategy, MergeStrategy::Overlap | MergeStrategy::Smart)
            && segment.overlap_with_prev > 0
            && !outcome.text.is_empty()
        {
            let dropped = dedup_overlap(&mut outcome.text, &mut incoming, segment);
            outcome.overlap_words_dropped += dropped;
        }

        if incoming.is_empty() {
            prev_end_sample = Some(segment.end_sample);
            continue;
        }

        if !outcome.text.is_empty() {
            if long_gap {
                outcome.paragraph_hints.push(outcome.text.len());
            }
            if strategy == MergeStrategy::Smart && long_gap {
                outcome.text = terminate_sentence(&outcome.text);
                outcome.text.push_str("\n\n");
                outcome.paragraph_breaks += 1;
            } else {
                outcome.text.push(' ');
            }
        }
        outcome.text.push_str(&incoming);
        prev_end_sample = Some(segment.end_sample);
    }

    outcome
}

/// Remove the duplicated overlap window between the accumulated text and an
/// incoming segment.
///
/// Finds the longest common run, at word granularity and case-insensitive,
/// that is both a suffix of the accumulated text and a prefix of the
/// incoming one, limited to the words that can fit in the overlap window
/// ±1 s. Keeps whichever copy preserves more characters. Returns the number
/// of words dropped.
fn dedup_overlap(acc: &mut String, incoming: &mut String, segment: &SegmentTranscript) -> usize {
    let overlap_secs = segment.overlap_with_prev as f32 / SAMPLE_RATE as f32;
    let window = ((overlap_secs + 1.0) * WORDS_PER_SEC).ceil() as usize;

    let acc_words: Vec<&str> = acc.split_whitespace().collect();
    let inc_words: Vec<&str> = incoming.split_whitespace().collect();
    let max_n = window.min(acc_words.len()).min(inc_words.len());

    // Word comparison ignores case and edge punctuation, so "watson" and
    // "Watson," count as the same spoken word.
    let norm = |w: &str| {
        w.trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
    };

    let mut matched = 0;
    for n in (1..=max_n).rev() {
        let suffix = &acc_words[acc_words.len() - n..];
        let prefix = &inc_words[..n];
        let equal = suffix
            .iter()
            .zip(prefix.iter())
            .all(|(a, b)| norm(a) == norm(b));
        if equal {
            matched = n;
            break;
        }
    }
    if matched == 0 {
        return 0;
    }

    let suffix_chars: usize = acc_words[acc_words.len() - matched..]
        .iter()
        .map(|w| w.chars().count())
        .sum();
    let prefix_chars: usize = inc_words[..matched].iter().map(|w| w.chars().count()).sum();

    if prefix_chars > suffix_chars {
        // The incoming copy preserves more characters: drop the suffix of
        // the accumulated text instead.
        *acc = acc_words[..acc_words.len() - matched].join(" ");
    } else {
        *incoming = inc_words[matched..].join(" ");
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: usize, start_s: f32, end_s: f32, overlap_s: f32, text: &str) -> SegmentTranscript {
        let rate = SAMPLE_RATE as f32;
        SegmentTranscript {
            index,
            start_sample: (start_s * rate) as usize,
            end_sample: (end_s * rate) as usize,
            overlap_with_prev: (overlap_s * rate) as usize,
            text: text.into(),
            language: None,
            speaker: None,
            error: None,
        }
    }

    // --- simple ---

    #[test]
    fn simple_concatenates_with_spaces() {
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "hello there"),
            seg(1, 10.0, 20.0, 0.0, "general remarks"),
        ];
        let out = merge(&segs, MergeStrategy::Simple);
        assert_eq!(out.text, "hello there general remarks");
    }

    #[test]
    fn simple_skips_empty_segments() {
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "start"),
            seg(1, 10.0, 20.0, 0.0, "   "),
            seg(2, 20.0, 30.0, 0.0, "end"),
        ];
        let out = merge(&segs, MergeStrategy::Simple);
        assert_eq!(out.text, "start end");
    }

    #[test]
    fn simple_trims_segment_whitespace() {
        let segs = vec![seg(0, 0.0, 5.0, 0.0, "  padded  ")];
        let out = merge(&segs, MergeStrategy::Simple);
        assert_eq!(out.text, "padded");
    }

    #[test]
    fn empty_input_merges_to_empty() {
        let out = merge(&[], MergeStrategy::Simple);
        assert_eq!(out.text, "");
        assert!(out.paragraph_hints.is_empty());
    }

    #[test]
    fn paragraph_hints_mark_long_gaps() {
        // 2 s of silence between the segments.
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "first part"),
            seg(1, 12.0, 20.0, 0.0, "second part"),
        ];
        let out = merge(&segs, MergeStrategy::Simple);
        assert_eq!(out.paragraph_hints, vec!["first part".len()]);
    }

    #[test]
    fn short_gaps_produce_no_hints() {
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "first part"),
            seg(1, 10.5, 20.0, 0.0, "second part"),
        ];
        let out = merge(&segs, MergeStrategy::Simple);
        assert!(out.paragraph_hints.is_empty());
    }

    // --- overlap ---

    #[test]
    fn overlap_drops_duplicated_words() {
        let segs = vec![
            seg(0, 0.0, 20.0, 0.0, "we should review the quarterly numbers"),
            seg(1, 18.0, 38.0, 2.0, "the quarterly numbers look strong this time"),
        ];
        let out = merge(&segs, MergeStrategy::Overlap);
        assert_eq!(
            out.text,
            "we should review the quarterly numbers look strong this time"
        );
        assert_eq!(out.overlap_words_dropped, 3);
    }

    #[test]
    fn overlap_without_window_behaves_like_simple() {
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "one two"),
            seg(1, 10.0, 20.0, 0.0, "one two"),
        ];
        let out = merge(&segs, MergeStrategy::Overlap);
        // No recorded overlap → no dedup, repetition preserved.
        assert_eq!(out.text, "one two one two");
        assert_eq!(out.overlap_words_dropped, 0);
    }

    #[test]
    fn overlap_is_case_insensitive() {
        let segs = vec![
            seg(0, 0.0, 20.0, 0.0, "meet me at Baker Street"),
            seg(1, 18.0, 30.0, 2.0, "baker street at noon"),
        ];
        let out = merge(&segs, MergeStrategy::Overlap);
        assert_eq!(out.text, "meet me at Baker Street at noon");
        assert_eq!(out.overlap_words_dropped, 2);
    }

    #[test]
    fn overlap_keeps_copy_with_more_characters() {
        // The incoming copy carries punctuation and so preserves more
        // characters; it should win the tie-break.
        let segs = vec![
            seg(0, 0.0, 20.0, 0.0, "ask doctor watson"),
            seg(1, 18.0, 30.0, 2.0, "doctor watson, please come in"),
        ];
        let out = merge(&segs, MergeStrategy::Overlap);
        // "watson," (8 chars) > "watson" (6): incoming copy wins.
        assert_eq!(out.text, "ask doctor watson, please come in");
    }

    #[test]
    fn overlap_window_bounds_comparison() {
        // A word repeated far outside the overlap window must not be
        // treated as overlap: window is (2 s + 1 s) * 3 w/s = 9 words.
        let long_head = "a b c d e f g h i j k l";
        let segs = vec![
            seg(0, 0.0, 20.0, 0.0, long_head),
            seg(1, 18.0, 30.0, 2.0, "x y z"),
        ];
        let out = merge(&segs, MergeStrategy::Overlap);
        assert_eq!(out.text, format!("{long_head} x y z"));
    }

    // --- smart ---

    #[test]
    fn smart_inserts_paragraphs_at_long_silences() {
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "that wraps up the first topic"),
            seg(1, 12.0, 20.0, 0.0, "moving on to the roadmap"),
        ];
        let out = merge(&segs, MergeStrategy::Smart);
        assert_eq!(
            out.text,
            "that wraps up the first topic.\n\nmoving on to the roadmap"
        );
        assert_eq!(out.paragraph_breaks, 1);
    }

    #[test]
    fn smart_keeps_existing_terminal_punctuation() {
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "is that everything?"),
            seg(1, 12.0, 20.0, 0.0, "yes it is"),
        ];
        let out = merge(&segs, MergeStrategy::Smart);
        assert_eq!(out.text, "is that everything?\n\nyes it is");
    }

    #[test]
    fn smart_also_dedups_overlap() {
        let segs = vec![
            seg(0, 0.0, 20.0, 0.0, "the plan is simple"),
            seg(1, 18.0, 30.0, 2.0, "is simple we start tomorrow"),
        ];
        let out = merge(&segs, MergeStrategy::Smart);
        assert_eq!(out.text, "the plan is simple we start tomorrow");
        assert_eq!(out.overlap_words_dropped, 2);
    }

    #[test]
    fn failed_segments_are_transparent() {
        let mut failed = seg(1, 10.0, 20.0, 0.0, "");
        failed.error = Some("inference failed".into());
        let segs = vec![
            seg(0, 0.0, 10.0, 0.0, "before the failure"),
            failed,
            seg(2, 20.0, 30.0, 0.0, "after the failure"),
        ];
        let out = merge(&segs, MergeStrategy::Simple);
        assert_eq!(out.text, "before the failure after the failure");
    }
}
