//! Local tempo curve
//!
//! Windowed autocorrelation restricted to ±`max_local_deviation` around the
//! global beat lag. Each window yields one tempo at its center; frames in
//! between are linearly interpolated. Used to drive the beat tracker on
//! material with tempo drift.

use super::autocorrelation::{autocorrelation, standardize};
use super::peak_picking::refine_peak;
use crate::config::TempoConfig;

/// Estimate a per-frame tempo curve around `global_bpm`
///
/// Returns one BPM value per envelope frame. Windows without periodicity
/// keep the global tempo.
pub fn estimate_tempo_curve(
    envelope: &[f32],
    sample_rate: u32,
    hop_length: usize,
    global_bpm: f32,
    config: &TempoConfig,
) -> Vec<f32> {
    let n = envelope.len();
    if n == 0 || sample_rate == 0 || hop_length == 0 || global_bpm <= 0.0 {
        return vec![global_bpm; n];
    }

    let frame_rate = sample_rate as f32 / hop_length as f32;
    let frames_per_minute = 60.0 * frame_rate;
    let global_lag = frames_per_minute / global_bpm;
    let dev = config.max_local_deviation;

    let lo_lag = (global_lag * (1.0 - dev)).floor().max(1.0) as usize;
    let hi_lag = (global_lag * (1.0 + dev)).ceil() as usize;

    // At least two beat periods per window
    let window = ((config.local_window_seconds * frame_rate).round() as usize)
        .max((2.0 * global_lag * (1.0 + dev)).ceil() as usize + 2)
        .min(n);
    let step = (window / 4).max(1);

    let lower = (global_bpm * (1.0 - dev)).max(config.min_bpm);
    let upper = (global_bpm * (1.0 + dev)).min(config.max_bpm);

    let mut centers: Vec<(f32, f32)> = Vec::new(); // (center frame, bpm)
    let mut start = 0usize;
    loop {
        let end = (start + window).min(n);
        let segment = &envelope[start..end];
        let center = (start + end) as f32 / 2.0;

        let bpm = standardize(segment)
            .and_then(|x| {
                let hi = hi_lag.min(x.len().saturating_sub(2));
                if lo_lag > hi {
                    return None;
                }
                let acf = autocorrelation(&x, hi + 1);
                let mut best = lo_lag;
                for lag in lo_lag..=hi {
                    if acf[lag] > acf[best] {
                        best = lag;
                    }
                }
                if acf[best] <= 0.0 {
                    return None;
                }
                Some(frames_per_minute / refine_peak(&acf, best))
            })
            .unwrap_or(global_bpm)
            .clamp(lower.min(upper), upper.max(lower));
        centers.push((center, bpm));

        if end == n {
            break;
        }
        start += step;
    }

    log::debug!(
        "Tempo curve: {} windows of {} frames around {:.2} BPM",
        centers.len(),
        window,
        global_bpm
    );

    interpolate(&centers, n)
}

/// Piecewise-linear interpolation of (position, value) knots onto `0..n`
fn interpolate(knots: &[(f32, f32)], n: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(n);
    let mut k = 0usize;
    for i in 0..n {
        let t = i as f32;
        while k + 1 < knots.len() && knots[k + 1].0 <= t {
            k += 1;
        }
        let (x0, y0) = knots[k];
        let value = match knots.get(k + 1) {
            Some(&(x1, y1)) if t > x0 && x1 > x0 => y0 + (y1 - y0) * (t - x0) / (x1 - x0),
            _ => y0,
        };
        out.push(value);
    }
    out
}
