//! Sample-accurate loop boundary refinement
//!
//! # Algorithm
//!
//! 1. Snap the start to the rising zero crossing within ±`zero_crossing_radius`
//!    that minimizes local RMS × (1 + distance / radius)
//! 2. Search loop lengths within ±`length_search_radius` of the structural
//!    estimate, maximizing the mean normalized cross-correlation of probe
//!    windows against the same windows one length later (coarse step, then
//!    single-sample step around the coarse winner)
//! 3. Snap the end (start + length) to a rising crossing the same way, so the
//!    loop stays phase-continuous
//! 4. Rescore: normalized cross-correlation with the audio that follows the
//!    loop, or internal energy consistency when too little audio follows
//! 5. Confidence = (w·structural + (1−w)·correlation) × fade × (1 + musical bonus)

use crate::config::RefineConfig;
use crate::features::structure::LoopCandidate;
use crate::parallel::map_indices;

const EPSILON: f32 = 1e-10;

/// Coarse step of the loop-length search in samples
const LENGTH_COARSE_STEP: usize = 4;

/// Probe windows compared during the loop-length search
const PROBE_COUNT: usize = 8;

/// Probe window length in samples
const PROBE_WINDOW: usize = 1024;

/// Longest fade-score edge window in samples
const FADE_EDGE_MAX: usize = 1024;

/// Added to the middle energy so a silent middle cannot lift the fade score
const FADE_EPSILON: f64 = 1e-9;

/// Musical context of the signal being refined
#[derive(Debug, Clone, Copy)]
pub struct RefineContext<'a> {
    /// Detected tempo in BPM (≤ 0 disables the musical bonus)
    pub tempo_bpm: f32,
    /// Beats per bar for the bar-length targets
    pub beats_per_bar: usize,
    /// Onset positions in samples, increasing
    pub onset_samples: &'a [usize],
    /// STFT hop, used to express refined boundaries in frames
    pub hop_length: usize,
}

/// Refine one structural candidate against the waveform
///
/// The returned candidate carries sample boundaries on rising zero crossings,
/// its waveform correlation and the combined confidence. Its
/// `structural_confidence` is passed through unchanged.
pub fn refine(
    signal: &[f32],
    sample_rate: u32,
    candidate: &LoopCandidate,
    context: &RefineContext<'_>,
    config: &RefineConfig,
) -> LoopCandidate {
    let n = signal.len();
    let length = candidate.length_samples();
    if n < 2 || length == 0 || candidate.start_sample >= n || sample_rate == 0 {
        return LoopCandidate {
            correlation: 0.0,
            confidence: 0.0,
            ..candidate.clone()
        };
    }

    let radius = config.zero_crossing_radius;
    let start = snap_to_zero_crossing(signal, candidate.start_sample, radius, config.energy_window);
    let length = refine_length(signal, start, length, config.length_search_radius);

    let target = (start + length).min(n);
    let mut end = snap_to_zero_crossing(signal, target, radius, config.energy_window);
    if end <= start {
        end = target;
    }
    let loop_len = end - start;

    let following = n - end;
    let correlation = if loop_len > 0
        && following as f32 >= config.min_repeat_fraction * loop_len as f32
    {
        let m = loop_len.min(following);
        normalized_cross_correlation(&signal[start..start + m], &signal[end..end + m])
    } else {
        internal_consistency(&signal[start..end], config.consistency_frame)
    };

    let fade = fade_score(&signal[start..end]);
    let length_seconds = loop_len as f32 / sample_rate as f32;
    let bonus = musical_bonus(length_seconds, context.tempo_bpm, context.beats_per_bar);

    let w = config.structural_weight.clamp(0.0, 1.0);
    let base = w * candidate.structural_confidence + (1.0 - w) * correlation.max(0.0);
    let confidence = (base * fade * (1.0 + bonus)).clamp(0.0, 1.0);

    let tolerance = (config.onset_tolerance_seconds * sample_rate as f32).round() as usize;
    let on_onsets = near_onset(start, context.onset_samples, tolerance)
        && near_onset(end, context.onset_samples, tolerance);

    let hop = context.hop_length.max(1);
    LoopCandidate {
        start_frame: start / hop,
        end_frame: end / hop,
        start_sample: start,
        end_sample: end,
        length_seconds,
        correlation,
        confidence,
        structural_confidence: candidate.structural_confidence,
        is_musical_boundary: bonus > 0.0 || on_onsets,
    }
}

/// Refine every candidate, one per rayon task when `parallel` is set
pub fn refine_all(
    signal: &[f32],
    sample_rate: u32,
    candidates: &[LoopCandidate],
    context: &RefineContext<'_>,
    config: &RefineConfig,
    parallel: bool,
) -> Vec<LoopCandidate> {
    log::debug!("Refining {} loop candidates", candidates.len());
    map_indices(candidates.len(), parallel, |i| {
        refine(signal, sample_rate, &candidates[i], context, config)
    })
}

/// Order candidates best first
///
/// Confidence descending, then structural confidence descending, then
/// shorter loops first.
pub fn rank_candidates(candidates: &mut [LoopCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.structural_confidence
                    .partial_cmp(&a.structural_confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.length_samples().cmp(&b.length_samples()))
    });
}

/// RMS over `[center - half, center + half)`, clipped to the signal
fn local_rms(signal: &[f32], center: usize, half: usize) -> f32 {
    let lo = center.saturating_sub(half);
    let hi = (center + half.max(1)).min(signal.len());
    rms(&signal[lo..hi])
}

fn mean_square(segment: &[f32]) -> f64 {
    if segment.is_empty() {
        return 0.0;
    }
    segment.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / segment.len() as f64
}

fn rms(segment: &[f32]) -> f32 {
    mean_square(segment).sqrt() as f32
}

/// Nearest quiet rising zero crossing to `target`
///
/// A rising crossing at `i` means `signal[i - 1] < 0 <= signal[i]`. Among the
/// crossings within `radius` the one with the lowest local RMS weighted by
/// `1 + distance / radius` wins; ties go to the closer, then the earlier one.
/// Returns `target` (clipped to the signal length) when there is no crossing.
pub fn snap_to_zero_crossing(signal: &[f32], target: usize, radius: usize, energy_window: usize) -> usize {
    let n = signal.len();
    let target = target.min(n);
    if n < 2 {
        return target;
    }
    let lo = target.saturating_sub(radius).max(1);
    let hi = (target + radius).min(n - 1);

    let mut best: Option<(usize, f32, usize)> = None;
    for i in lo..=hi {
        if !(signal[i - 1] < 0.0 && signal[i] >= 0.0) {
            continue;
        }
        let distance = i.abs_diff(target);
        let weight = if radius == 0 {
            1.0
        } else {
            1.0 + distance as f32 / radius as f32
        };
        let score = local_rms(signal, i, energy_window) * weight;
        let better = match best {
            None => true,
            Some((_, s, d)) => score < s || (score == s && distance < d),
        };
        if better {
            best = Some((i, score, distance));
        }
    }
    best.map_or(target, |(i, _, _)| i)
}

/// Mean-removed normalized cross-correlation of two equal-length segments
///
/// Returns a value in [-1, 1]; 0 when either segment has no variance.
pub fn normalized_cross_correlation(a: &[f32], b: &[f32]) -> f32 {
    let m = a.len().min(b.len());
    if m == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..m], &b[..m]);
    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / m as f64;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / m as f64;

    let mut cross = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cross += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom < EPSILON as f64 {
        return 0.0;
    }
    (cross / denom).clamp(-1.0, 1.0) as f32
}

/// Best loop length near `length` by probe-window waveform match
///
/// Probes of `PROBE_WINDOW` samples are spread over the loop and compared with
/// the audio one candidate length later. Only probes that fit for the longest
/// candidate length are used. Keeps `length` when no probe fits or nothing
/// correlates positively.
fn refine_length(signal: &[f32], start: usize, length: usize, radius: usize) -> usize {
    if radius == 0 {
        return length;
    }
    let n = signal.len();
    let lo = length.saturating_sub(radius).max(1);
    let hi = length + radius;
    let window = PROBE_WINDOW.min(length);
    let span = length.saturating_sub(window);

    let probes: Vec<usize> = (0..PROBE_COUNT)
        .map(|p| start + p * span / PROBE_COUNT)
        .filter(|&o| o + hi + window <= n)
        .collect();
    if probes.is_empty() {
        return length;
    }

    let score = |l: usize| -> f32 {
        probes
            .iter()
            .map(|&o| normalized_cross_correlation(&signal[o..o + window], &signal[o + l..o + l + window]))
            .sum::<f32>()
            / probes.len() as f32
    };

    // Higher score wins; ties go to the length closest to the estimate
    let better = |l: usize, s: f32, best: Option<(usize, f32)>| match best {
        None => true,
        Some((bl, bs)) => s > bs || (s == bs && l.abs_diff(length) < bl.abs_diff(length)),
    };

    let mut best: Option<(usize, f32)> = None;
    for l in (lo..=hi).step_by(LENGTH_COARSE_STEP) {
        let s = score(l);
        if better(l, s, best) {
            best = Some((l, s));
        }
    }
    if let Some((coarse, _)) = best {
        let fine_lo = coarse.saturating_sub(LENGTH_COARSE_STEP).max(lo);
        let fine_hi = (coarse + LENGTH_COARSE_STEP).min(hi);
        for l in fine_lo..=fine_hi {
            let s = score(l);
            if better(l, s, best) {
                best = Some((l, s));
            }
        }
    }

    match best {
        Some((l, s)) if s > 0.0 => {
            log::debug!("Loop length {} -> {} (probe correlation {:.3})", length, l, s);
            l
        }
        _ => length,
    }
}

/// 1 − variance / mean² of per-frame energies, floored at 0
///
/// Steady material scores near 1. Fewer than two frames, or silence, score 0.
pub fn internal_consistency(segment: &[f32], frame: usize) -> f32 {
    let frame = frame.max(1);
    let energies: Vec<f64> = segment
        .chunks_exact(frame)
        .map(|c| c.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / frame as f64)
        .collect();
    if energies.len() < 2 {
        return 0.0;
    }
    let mean = energies.iter().sum::<f64>() / energies.len() as f64;
    if mean < EPSILON as f64 {
        return 0.0;
    }
    let variance = energies.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / energies.len() as f64;
    (1.0 - variance / (mean * mean)).max(0.0) as f32
}

/// Penalty for loops that start or end much quieter than their middle
///
/// Edge windows are `min(FADE_EDGE_MAX, 5 %)` of the loop. The score is
/// `min(1, start/mid, end/mid)` over mean-square energies, with a small
/// epsilon under the middle, floored at 0.5. A silent edge therefore scores
/// 0.5 even when the middle is silent too.
pub fn fade_score(segment: &[f32]) -> f32 {
    let len = segment.len();
    if len < 2 {
        return 1.0;
    }
    let edge = (len / 20).clamp(1, FADE_EDGE_MAX);
    let mid_start = (len / 2).saturating_sub(edge / 2).min(len - edge);

    let start_e = mean_square(&segment[..edge]);
    let end_e = mean_square(&segment[len - edge..]);
    let mid_e = mean_square(&segment[mid_start..mid_start + edge]) + FADE_EPSILON;
    (start_e / mid_e).min(end_e / mid_e).min(1.0).max(0.5) as f32
}

/// Bonus for loop lengths that match whole bars or common beat counts
///
/// Targets are 1, 2 and 4 bars and 2 and 8 beats. Relative error ≤ 2 % gives
/// 0.2, ≤ 5 % gives 0.1, ≤ 10 % gives 0.05.
pub fn musical_bonus(length_seconds: f32, tempo_bpm: f32, beats_per_bar: usize) -> f32 {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 || length_seconds.is_nan() || length_seconds <= 0.0 {
        return 0.0;
    }
    let beat = 60.0 / tempo_bpm;
    let bar = beats_per_bar.max(1) as f32;
    let error = [bar, 2.0 * bar, 4.0 * bar, 2.0, 8.0]
        .iter()
        .map(|&beats| {
            let target = beats * beat;
            (length_seconds - target).abs() / target
        })
        .fold(f32::INFINITY, f32::min);

    if error <= 0.02 {
        0.2
    } else if error <= 0.05 {
        0.1
    } else if error <= 0.1 {
        0.05
    } else {
        0.0
    }
}

/// Any onset within `tolerance` samples of `position`
fn near_onset(position: usize, onsets: &[usize], tolerance: usize) -> bool {
    let idx = onsets.partition_point(|&o| o < position);
    let after = onsets.get(idx).is_some_and(|&o| o - position <= tolerance);
    let before = idx > 0 && position - onsets[idx - 1] <= tolerance;
    after || before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, seconds: f32, sr: u32) -> Vec<f32> {
        let n = (seconds * sr as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    fn arpeggio(repeats: usize, sr: u32) -> Vec<f32> {
        let mut pattern = Vec::new();
        for f in [440.0, 523.25, 659.25, 392.0] {
            pattern.extend(tone(f, 0.5, sr));
        }
        pattern.repeat(repeats)
    }

    fn candidate(start: usize, end: usize, structural: f32) -> LoopCandidate {
        LoopCandidate {
            start_frame: start / 512,
            end_frame: end / 512,
            start_sample: start,
            end_sample: end,
            length_seconds: 0.0,
            correlation: 0.0,
            confidence: structural,
            structural_confidence: structural,
            is_musical_boundary: false,
        }
    }

    fn context(tempo_bpm: f32, onsets: &[usize]) -> RefineContext<'_> {
        RefineContext {
            tempo_bpm,
            beats_per_bar: 4,
            onset_samples: onsets,
            hop_length: 512,
        }
    }

    #[test]
    fn test_snap_finds_rising_crossing() {
        let signal = vec![0.5, 0.2, -0.1, -0.4, -0.2, 0.1, 0.3, 0.2];
        assert_eq!(snap_to_zero_crossing(&signal, 3, 4, 2), 5);
    }

    #[test]
    fn test_snap_prefers_quiet_crossing() {
        let mut signal = vec![0.0f32; 200];
        // Loud crossing next to the target, quiet one further away
        signal[99] = -0.9;
        signal[100] = 0.9;
        signal[129] = -0.01;
        signal[130] = 0.01;
        assert_eq!(snap_to_zero_crossing(&signal, 100, 64, 4), 130);
    }

    #[test]
    fn test_snap_without_crossing_keeps_target() {
        let signal = vec![0.3f32; 100];
        assert_eq!(snap_to_zero_crossing(&signal, 40, 10, 4), 40);
        assert_eq!(snap_to_zero_crossing(&signal, 500, 10, 4), 100);
    }

    #[test]
    fn test_normalized_cross_correlation() {
        let a = tone(440.0, 0.1, 22050);
        let inverted: Vec<f32> = a.iter().map(|x| -x).collect();
        assert!((normalized_cross_correlation(&a, &a) - 1.0).abs() < 1e-5);
        assert!((normalized_cross_correlation(&a, &inverted) + 1.0).abs() < 1e-5);
        assert_eq!(normalized_cross_correlation(&a, &[0.0; 100]), 0.0);
        assert_eq!(normalized_cross_correlation(&[], &[]), 0.0);
    }

    #[test]
    fn test_internal_consistency() {
        let steady = tone(440.0, 1.0, 22050);
        assert!(internal_consistency(&steady, 1024) > 0.95);

        let mut bursty = vec![0.0f32; 1024 * 8];
        for x in bursty.iter_mut().take(1024) {
            *x = 0.8;
        }
        assert!(internal_consistency(&bursty, 1024) < 0.1);
        assert_eq!(internal_consistency(&[0.0; 4096], 1024), 0.0);
        assert_eq!(internal_consistency(&steady[..500], 1024), 0.0);
    }

    #[test]
    fn test_fade_score() {
        let steady = tone(440.0, 1.0, 22050);
        assert!(fade_score(&steady) > 0.9);

        let mut fade_in: Vec<f32> = steady.clone();
        for x in fade_in.iter_mut().take(2000) {
            *x = 0.0;
        }
        assert_eq!(fade_score(&fade_in), 0.5);
        assert_eq!(fade_score(&[0.0; 1000]), 0.5);
    }

    #[test]
    fn test_fade_score_silent_middle() {
        // Sound for the first 40 %, silence through the middle and the end
        let mut gated = tone(440.0, 1.0, 22050);
        let cut = gated.len() * 2 / 5;
        for x in gated.iter_mut().skip(cut) {
            *x = 0.0;
        }
        assert_eq!(fade_score(&gated), 0.5);

        // Sound at both edges with a silent middle is not penalized
        let mut edges = tone(440.0, 1.0, 22050);
        let len = edges.len();
        for x in edges.iter_mut().take(len * 3 / 4).skip(len / 4) {
            *x = 0.0;
        }
        assert_eq!(fade_score(&edges), 1.0);
    }

    #[test]
    fn test_musical_bonus_tiers() {
        // One 4/4 bar at 120 BPM is 2.0 s
        assert_eq!(musical_bonus(2.0, 120.0, 4), 0.2);
        assert_eq!(musical_bonus(2.08, 120.0, 4), 0.1);
        assert_eq!(musical_bonus(2.16, 120.0, 4), 0.05);
        assert_eq!(musical_bonus(2.5, 120.0, 4), 0.0);
        // Two beats
        assert_eq!(musical_bonus(1.0, 120.0, 4), 0.2);
        assert_eq!(musical_bonus(2.0, 0.0, 4), 0.0);
    }

    #[test]
    fn test_near_onset() {
        let onsets = [100, 1000, 5000];
        assert!(near_onset(1020, &onsets, 50));
        assert!(near_onset(980, &onsets, 50));
        assert!(!near_onset(3000, &onsets, 50));
        assert!(!near_onset(10, &[], 50));
    }

    #[test]
    fn test_refine_repeated_pattern_is_sample_accurate() {
        let sr = 22050;
        let signal = arpeggio(4, sr);
        let period = 2 * sr as usize;
        // Structural estimate 300 samples too long
        let rough = candidate(0, period + 300, 1.0);

        let refined = refine(&signal, sr, &rough, &context(120.0, &[]), &RefineConfig::default());

        let s = refined.start_sample;
        assert!(s > 0 && s < 200, "start {}", s);
        assert!(signal[s - 1] < 0.0 && signal[s] >= 0.0);
        assert_eq!(refined.length_samples(), period);
        assert!(refined.correlation > 0.99);
        assert!(refined.is_musical_boundary);
        assert!(refined.confidence >= 0.99);
        assert_eq!(refined.structural_confidence, 1.0);
    }

    #[test]
    fn test_refine_tail_loop_uses_consistency() {
        let sr = 22050;
        let signal = tone(440.0, 2.5, sr);
        // Loop covers the last two seconds; only 0.5 s follows
        let rough = candidate(0, 2 * sr as usize, 0.5);
        let refined = refine(&signal, sr, &rough, &context(0.0, &[]), &RefineConfig::default());

        assert!(refined.correlation > 0.9);
        assert!(!refined.is_musical_boundary);
        assert!(refined.confidence <= 1.0 && refined.confidence > 0.5);
    }

    #[test]
    fn test_refine_degenerate_candidate() {
        let signal = vec![0.1f32; 100];
        let refined = refine(
            &signal,
            22050,
            &candidate(500, 900, 0.8),
            &context(120.0, &[]),
            &RefineConfig::default(),
        );
        assert_eq!(refined.confidence, 0.0);
        assert_eq!(refined.start_sample, 500);
    }

    #[test]
    fn test_rank_candidates_order() {
        let mut a = candidate(0, 1000, 0.9);
        a.confidence = 0.7;
        let mut b = candidate(0, 2000, 0.5);
        b.confidence = 0.9;
        let mut c = candidate(0, 500, 0.9);
        c.confidence = 0.7;
        let mut list = vec![a, b, c];
        rank_candidates(&mut list);
        let lengths: Vec<usize> = list.iter().map(|c| c.length_samples()).collect();
        assert_eq!(lengths, vec![2000, 500, 1000]);
    }

    #[test]
    fn test_refine_all_parallel_matches_sequential() {
        let sr = 22050;
        let signal = arpeggio(3, sr);
        let rough = vec![candidate(0, 2 * sr as usize, 1.0), candidate(1000, 12000, 0.4)];
        let ctx = context(120.0, &[]);
        let config = RefineConfig::default();
        let sequential = refine_all(&signal, sr, &rough, &ctx, &config, false);
        let parallel = refine_all(&signal, sr, &rough, &ctx, &config, true);
        assert_eq!(sequential, parallel);
    }
}
