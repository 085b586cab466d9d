//! Strategy implementations.

use murmur_audio::energy::{envelope, frame_start_sample, HOP_SAMPLES};
use tracing::debug;

use crate::config::SegmenterConfig;
use crate::types::{Segment, SegmentStrategy};

/// Split a buffer into ordered, densely indexed segments.
///
/// Inputs shorter than `chunk_duration` always yield one segment covering
/// the full buffer, whatever the strategy.
#[must_use]
pub fn segment(samples: &[i16], strategy: SegmentStrategy, cfg: &SegmenterConfig) -> Vec<Segment> {
    if samples.is_empty() {
        return Vec::new();
    }
    if samples.len() < cfg.chunk_samples() {
        return vec![Segment {
            index: 0,
            start_sample: 0,
            end_sample: samples.len(),
            overlap_with_prev: 0,
        }];
    }

    let mut segments = match strategy {
        SegmentStrategy::Fixed => split_fixed(0, samples.len(), cfg),
        SegmentStrategy::Vad => split_vad(samples, cfg),
        SegmentStrategy::Hybrid => split_hybrid(samples, cfg),
    };

    reindex(&mut segments);
    debug!(
        strategy = strategy.as_str(),
        segments = segments.len(),
        samples = samples.len(),
        "segmented buffer"
    );
    segments
}

/// Fixed-length chunks over `[start, end)` with the configured overlap.
fn split_fixed(start: usize, end: usize, cfg: &SegmenterConfig) -> Vec<Segment> {
    let chunk = cfg.chunk_samples().max(1);
    // Overlap must leave forward progress.
    let overlap = cfg.overlap_samples().min(chunk - 1);

    let mut segments = Vec::new();
    let mut cur = start;
    loop {
        let seg_end = (cur + chunk).min(end);
        let first = segments.is_empty();
        segments.push(Segment {
            index: 0,
            start_sample: cur,
            end_sample: seg_end,
            overlap_with_prev: if first { 0 } else { overlap },
        });
        if seg_end == end {
            break;
        }
        cur = seg_end - overlap;
    }
    segments
}

/// Speech regions between qualifying silences, padded by `pad_ms`.
///
/// A whole-silence buffer yields one segment covering everything; the
/// recognizer decides what to do with it.
fn split_vad(samples: &[i16], cfg: &SegmenterConfig) -> Vec<Segment> {
    let regions = speech_regions(samples, cfg);
    if regions.is_empty() {
        return vec![Segment {
            index: 0,
            start_sample: 0,
            end_sample: samples.len(),
            overlap_with_prev: 0,
        }];
    }
    regions
        .into_iter()
        .map(|(start, end)| Segment {
            index: 0,
            start_sample: start,
            end_sample: end,
            overlap_with_prev: 0,
        })
        .collect()
}

/// VAD regions, with over-long regions re-split at energy minima.
fn split_hybrid(samples: &[i16], cfg: &SegmenterConfig) -> Vec<Segment> {
    let env = envelope(samples);
    let regions = {
        let r = speech_regions(samples, cfg);
        if r.is_empty() {
            vec![(0, samples.len())]
        } else {
            r
        }
    };

    let max_chunk = cfg.max_chunk_samples().max(1);
    let overlap = cfg.overlap_samples().min(max_chunk - 1);

    let mut segments = Vec::new();
    for (region_start, region_end) in regions {
        let mut cur = region_start;
        while region_end - cur > max_chunk {
            let cut = pick_cut(&env, cur, region_end, cfg).unwrap_or_else(|| {
                (cur + max_chunk).min(region_end)
            });
            // Guard forward progress even with a degenerate band.
            let cut = if cut <= cur + overlap {
                (cur + max_chunk).min(region_end)
            } else {
                cut
            };
            segments.push(Segment {
                index: 0,
                start_sample: cur,
                end_sample: cut,
                overlap_with_prev: if cur > region_start { overlap } else { 0 },
            });
            cur = cut - overlap;
        }
        if cur < region_end {
            segments.push(Segment {
                index: 0,
                start_sample: cur,
                end_sample: region_end,
                overlap_with_prev: if cur > region_start { overlap } else { 0 },
            });
        }
    }
    segments
}

/// Choose the next cut point: the energy-minimum envelope frame whose start
/// falls inside the `[min_seg, max_seg]` band from `cur`. Equal minima
/// resolve to the later frame, which favors ending a segment at a silence.
fn pick_cut(env: &[f32], cur: usize, region_end: usize, cfg: &SegmenterConfig) -> Option<usize> {
    let band_lo = cur + cfg.min_seg_samples();
    let band_hi = (cur + cfg.max_seg_samples()).min(region_end.saturating_sub(1));
    if band_lo >= band_hi {
        return None;
    }

    let first_frame = band_lo.div_ceil(HOP_SAMPLES);
    let last_frame = band_hi / HOP_SAMPLES;
    if first_frame > last_frame || first_frame >= env.len() {
        return None;
    }
    let last_frame = last_frame.min(env.len() - 1);

    let mut best_frame = first_frame;
    let mut best_rms = env[first_frame];
    for frame in first_frame..=last_frame {
        if env[frame] <= best_rms {
            best_rms = env[frame];
            best_frame = frame;
        }
    }
    Some(frame_start_sample(best_frame))
}

/// Padded speech regions in sample coordinates.
///
/// Silences shorter than `min_silence_duration` stay inside speech regions.
fn speech_regions(samples: &[i16], cfg: &SegmenterConfig) -> Vec<(usize, usize)> {
    let env = envelope(samples);
    let min_silence = cfg.min_silence_frames();
    let pad = cfg.pad_samples();

    // Qualifying silence runs in frame coordinates.
    let mut silences: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &rms) in env.iter().enumerate() {
        if rms < cfg.silence_threshold {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else if let Some(start) = run_start.take() {
            if i - start >= min_silence {
                silences.push((start, i));
            }
        }
    }
    if let Some(start) = run_start {
        if env.len() - start >= min_silence {
            silences.push((start, env.len()));
        }
    }

    // Speech regions are the complement.
    let mut regions = Vec::new();
    let mut cursor_frame = 0usize;
    for (sil_start, sil_end) in &silences {
        if *sil_start > cursor_frame {
            regions.push((cursor_frame, *sil_start));
        }
        cursor_frame = *sil_end;
    }
    if cursor_frame < env.len() {
        regions.push((cursor_frame, env.len()));
    }

    regions
        .into_iter()
        .map(|(fs, fe)| {
            let start = frame_start_sample(fs).saturating_sub(pad);
            let end = if fe >= env.len() {
                samples.len()
            } else {
                (frame_start_sample(fe) + pad).min(samples.len())
            };
            (start, end)
        })
        .filter(|(s, e)| e > s)
        .collect()
}

/// Re-number segments densely in emission order.
fn reindex(segments: &mut [Segment]) {
    for (i, seg) in segments.iter_mut().enumerate() {
        seg.index = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_audio::SAMPLE_RATE;

    const RATE: usize = SAMPLE_RATE as usize;

    /// 200 Hz tone at a fixed amplitude. The period (80 samples) divides the
    /// envelope hop (160), so every analysis window sees identical content
    /// and the envelope is exactly flat over the tone.
    fn tone(seconds: f32, amplitude: f32) -> Vec<i16> {
        let n = (seconds * RATE as f32) as usize;
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * 200.0 * i as f32 / RATE as f32;
                (phase.sin() * amplitude * 32767.0) as i16
            })
            .collect()
    }

    fn silence(seconds: f32) -> Vec<i16> {
        vec![0i16; (seconds * RATE as f32) as usize]
    }

    fn assert_dense_and_ordered(segments: &[Segment]) {
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.index, i, "indices must be dense");
        }
        for pair in segments.windows(2) {
            assert!(
                pair[0].start_sample <= pair[1].start_sample,
                "segments must be ordered by start"
            );
        }
    }

    // --- fixed ---

    #[test]
    fn fixed_short_input_single_segment() {
        let samples = tone(5.0, 0.3);
        let segs = segment(&samples, SegmentStrategy::Fixed, &SegmenterConfig::default());
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start_sample, 0);
        assert_eq!(segs[0].end_sample, samples.len());
    }

    #[test]
    fn fixed_overlap_recorded() {
        let samples = tone(70.0, 0.3);
        let cfg = SegmenterConfig::default();
        let segs = segment(&samples, SegmentStrategy::Fixed, &cfg);
        // 70 s at 30 s chunks with 2 s overlap: [0,30) [28,58) [56,70)
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].overlap_with_prev, 0);
        assert_eq!(segs[1].overlap_with_prev, cfg.overlap_samples());
        assert_eq!(segs[1].start_sample, segs[0].end_sample - cfg.overlap_samples());
        assert_dense_and_ordered(&segs);
    }

    #[test]
    fn fixed_zero_overlap_concat_reproduces_buffer() {
        // With overlap = 0, concatenating the segments is the identity.
        let samples = tone(95.0, 0.2);
        let cfg = SegmenterConfig {
            overlap: 0.0,
            ..SegmenterConfig::default()
        };
        let segs = segment(&samples, SegmentStrategy::Fixed, &cfg);
        assert!(segs.len() > 1);

        let mut rebuilt = Vec::new();
        for seg in &segs {
            rebuilt.extend_from_slice(&samples[seg.start_sample..seg.end_sample]);
        }
        assert_eq!(rebuilt, samples);
    }

    #[test]
    fn fixed_last_segment_may_be_short() {
        let samples = tone(31.0, 0.3);
        let segs = segment(&samples, SegmentStrategy::Fixed, &SegmenterConfig::default());
        assert_eq!(segs.len(), 2);
        assert!(segs[1].len() < segs[0].len());
        assert_eq!(segs[1].end_sample, samples.len());
    }

    // --- vad ---

    #[test]
    fn vad_splits_on_silence() {
        let mut samples = tone(35.0, 0.3);
        samples.extend(silence(2.0));
        samples.extend(tone(35.0, 0.3));
        let segs = segment(&samples, SegmentStrategy::Vad, &SegmenterConfig::default());
        assert_eq!(segs.len(), 2);
        assert_dense_and_ordered(&segs);
        // The break must land inside the silence.
        let gap_start = 35 * RATE;
        let gap_end = 37 * RATE;
        assert!(segs[0].end_sample >= gap_start && segs[0].end_sample <= gap_end);
        assert!(segs[1].start_sample >= gap_start && segs[1].start_sample <= gap_end);
    }

    #[test]
    fn vad_all_silence_yields_whole_buffer() {
        let samples = silence(40.0);
        let segs = segment(&samples, SegmentStrategy::Vad, &SegmenterConfig::default());
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start_sample, 0);
        assert_eq!(segs[0].end_sample, samples.len());
    }

    #[test]
    fn vad_short_silence_does_not_split() {
        let mut samples = tone(20.0, 0.3);
        samples.extend(silence(0.3)); // below min_silence_duration
        samples.extend(tone(20.0, 0.3));
        let segs = segment(&samples, SegmentStrategy::Vad, &SegmenterConfig::default());
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn vad_padding_extends_regions() {
        let mut samples = silence(5.0);
        samples.extend(tone(30.0, 0.3));
        samples.extend(silence(5.0));
        let cfg = SegmenterConfig::default();
        let segs = segment(&samples, SegmentStrategy::Vad, &cfg);
        assert_eq!(segs.len(), 1);
        let speech_start = 5 * RATE;
        // Padded start sits up to pad_ms before the detected speech.
        assert!(segs[0].start_sample <= speech_start);
        assert!(segs[0].start_sample >= speech_start.saturating_sub(2 * cfg.pad_samples()));
    }

    // --- hybrid ---

    #[test]
    fn hybrid_long_speech_resplit_inside_band() {
        let samples = tone(70.0, 0.3);
        let cfg = SegmenterConfig::default(); // max_chunk 20 s, band 8–20 s
        let segs = segment(&samples, SegmentStrategy::Hybrid, &cfg);
        assert!(segs.len() > 1);
        assert_dense_and_ordered(&segs);
        for seg in &segs {
            assert!(
                seg.duration_secs() <= cfg.max_seg as f64 + 0.1,
                "segment of {:.1}s exceeds band",
                seg.duration_secs()
            );
        }
        // Later segments overlap their predecessor by the fixed overlap.
        assert!(segs[1].overlap_with_prev > 0);
    }

    #[test]
    fn hybrid_speech_silence_pattern() {
        // 30 s speech, 1 s silence, 30 s speech, 1 s silence, 58 s speech.
        // With max_chunk_duration raised to 45 s, the 30 s regions pass
        // through and the trailing 58 s region splits exactly once.
        let mut samples = Vec::new();
        samples.extend(tone(30.0, 0.3));
        samples.extend(silence(1.0));
        samples.extend(tone(30.0, 0.3));
        samples.extend(silence(1.0));
        samples.extend(tone(58.0, 0.3));

        let cfg = SegmenterConfig {
            max_chunk_duration: 45.0,
            ..SegmenterConfig::default()
        };
        let segs = segment(&samples, SegmentStrategy::Hybrid, &cfg);
        assert_eq!(segs.len(), 4, "expected 4 segments, got {segs:?}");
        assert_dense_and_ordered(&segs);

        // First two breaks land inside the silences.
        let sil1 = (30 * RATE, 31 * RATE);
        let sil2 = (61 * RATE, 62 * RATE);
        assert!(segs[0].end_sample >= sil1.0 && segs[0].end_sample <= sil1.1);
        assert!(segs[1].end_sample >= sil2.0 && segs[1].end_sample <= sil2.1);

        // The trailing region's fixed split carries overlap.
        assert_eq!(segs[2].overlap_with_prev, 0);
        assert!(segs[3].overlap_with_prev > 0);
    }

    #[test]
    fn hybrid_flat_energy_cuts_at_band_end() {
        // With a perfectly flat envelope every band frame ties; the later
        // frame wins, so the first piece spans the whole band.
        let samples = tone(50.0, 0.3);
        let cfg = SegmenterConfig::default();
        let segs = segment(&samples, SegmentStrategy::Hybrid, &cfg);
        let first = &segs[0];
        let upper = cfg.max_seg as f64;
        assert!(
            (first.duration_secs() - upper).abs() < 0.2,
            "first piece {:.2}s should sit at the band top {upper}s",
            first.duration_secs()
        );
    }

    #[test]
    fn hybrid_prefers_energy_minimum() {
        // 50 s of speech with a brief dip (not a qualifying silence) at 15 s:
        // the cut should snap to the dip rather than the band top.
        let mut samples = tone(15.0, 0.3);
        samples.extend(silence(0.2));
        samples.extend(tone(34.8, 0.3));
        let cfg = SegmenterConfig::default();
        let segs = segment(&samples, SegmentStrategy::Hybrid, &cfg);
        let cut = segs[0].end_sample as f64 / RATE as f64;
        assert!(
            (15.0..=15.3).contains(&cut),
            "cut at {cut:.2}s should land in the 15s dip"
        );
    }

    #[test]
    fn empty_input_no_segments() {
        let segs = segment(&[], SegmentStrategy::Hybrid, &SegmenterConfig::default());
        assert!(segs.is_empty());
    }

    #[test]
    fn indices_dense_across_strategies() {
        let mut samples = tone(40.0, 0.3);
        samples.extend(silence(1.0));
        samples.extend(tone(40.0, 0.3));
        for strategy in [SegmentStrategy::Fixed, SegmentStrategy::Vad, SegmentStrategy::Hybrid] {
            let segs = segment(&samples, strategy, &SegmenterConfig::default());
            assert_dense_and_ordered(&segs);
        }
    }
}
