//! Dynamic-programming beat tracker
//!
//! Finds the beat sequence that maximizes onset strength at the beats while
//! keeping inter-beat intervals close to the target period.
//!
//! # Algorithm
//!
//! 1. Normalize the onset envelope by its standard deviation
//! 2. Local score: convolve with a Gaussian of σ = fpb/32 spanning ±fpb
//!    frames (fpb = frames per beat, per frame for a tempo curve)
//! 3. Forward pass:
//!    `cum[i] = local[i] + max_j (cum[j] - tightness·(ln(i-j) - ln fpb)²)`
//!    for `j ∈ [i - 2.5·fpb, i - 0.5·fpb]`, keeping a backlink; leading
//!    frames below 1% of the strongest local score start no chain
//! 4. Tail: last local maximum of `cum` at or above half the median of all
//!    local-maximum scores
//! 5. Backtrack, then optionally trim weak leading/trailing beats
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use super::{BeatSequence, TempoInput};
use crate::config::BeatTrackerConfig;
use crate::error::AnalysisError;
use crate::features::onset::threshold::median;

const EPSILON: f32 = 1e-10;

/// Track beats through an onset envelope
///
/// # Arguments
///
/// * `envelope` - Onset-strength envelope
/// * `tempo` - Static BPM or a per-frame BPM curve
/// * `frame_rate` - Envelope frames per second (`sample_rate / hop_length`)
/// * `config` - Tightness, lookback window and trimming
///
/// # Returns
///
/// Strictly increasing beat frames. An envelope without onsets, or a
/// non-positive tempo, yields an empty sequence with tempo 0.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a non-positive frame rate or a
/// tempo curve whose length differs from the envelope.
pub fn track_beats(
    envelope: &[f32],
    tempo: &TempoInput,
    frame_rate: f32,
    config: &BeatTrackerConfig,
) -> Result<BeatSequence, AnalysisError> {
    if !(frame_rate > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid frame rate: {}",
            frame_rate
        )));
    }
    if let TempoInput::Curve(curve) = tempo {
        if curve.len() != envelope.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "Tempo curve has {} frames, envelope has {}",
                curve.len(),
                envelope.len()
            )));
        }
    }

    let n = envelope.len();
    log::debug!(
        "Tracking beats: {} frames at {:.2} fps, tempo {:.2} BPM",
        n,
        frame_rate,
        tempo.mean_bpm()
    );

    if n == 0 || !tempo.is_valid() {
        return Ok(BeatSequence::empty());
    }

    let normalized = match normalize_by_std(envelope) {
        Some(x) => x,
        None => {
            log::debug!("No onsets in envelope, no beats");
            return Ok(BeatSequence::empty());
        }
    };

    let fpb: Vec<f32> = (0..n)
        .map(|i| 60.0 * frame_rate / tempo.bpm_at(i))
        .collect();

    let local = local_score(&normalized, &fpb);
    let (cum, backlink) = forward_pass(&local, &fpb, config);
    let tail = last_beat(&cum);

    let mut frames = vec![tail];
    let mut current = tail;
    while let Some(prev) = backlink[current] {
        frames.push(prev);
        current = prev;
    }
    frames.reverse();

    if config.trim {
        frames = trim_beats(&local, frames);
    }

    log::debug!("Tracked {} beats", frames.len());

    Ok(BeatSequence {
        frames,
        tempo_bpm: tempo.mean_bpm(),
    })
}

/// Divide by the population standard deviation (`None` if the envelope is flat or silent)
fn normalize_by_std(envelope: &[f32]) -> Option<Vec<f32>> {
    let n = envelope.len() as f64;
    let mean = envelope.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = envelope.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt() as f32;
    if std < EPSILON || envelope.iter().all(|&v| v <= 0.0) {
        return None;
    }
    Some(envelope.iter().map(|&v| v / std).collect())
}

/// Gaussian-weighted onset strength around every frame
fn local_score(x: &[f32], fpb: &[f32]) -> Vec<f32> {
    let n = x.len();
    (0..n)
        .map(|i| {
            let radius = fpb[i].round().max(1.0) as isize;
            let sigma = fpb[i] / 32.0;
            let mut acc = 0.0f32;
            for d in -radius..=radius {
                let j = i as isize - d;
                if j < 0 || j >= n as isize {
                    continue;
                }
                let z = d as f32 / sigma;
                acc += x[j as usize] * (-0.5 * z * z).exp();
            }
            acc
        })
        .collect()
}

/// Cumulative score and backlinks
fn forward_pass(
    local: &[f32],
    fpb: &[f32],
    config: &BeatTrackerConfig,
) -> (Vec<f32>, Vec<Option<usize>>) {
    let n = local.len();
    let max_local = local.iter().copied().fold(0.0f32, f32::max);
    let start_threshold = 0.01 * max_local;

    let mut cum = vec![0.0f32; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];
    let mut chain_started = false;

    for i in 0..n {
        if !chain_started && local[i] < start_threshold {
            cum[i] = local[i];
            continue;
        }
        chain_started = true;

        let period = fpb[i];
        let nearest = (config.min_lookback_beats * period).round().max(1.0) as usize;
        let farthest = (config.max_lookback_beats * period).round() as usize;
        let ln_period = period.ln();

        let mut best: Option<(usize, f32)> = None;
        if i >= nearest {
            let lo = i.saturating_sub(farthest);
            for j in lo..=(i - nearest) {
                let dev = ((i - j) as f32).ln() - ln_period;
                let candidate = cum[j] - config.tightness * dev * dev;
                // Ties go to the later predecessor
                if best.is_none_or(|(_, s)| candidate >= s) {
                    best = Some((j, candidate));
                }
            }
        }

        match best {
            Some((j, score)) => {
                cum[i] = local[i] + score;
                backlink[i] = Some(j);
            }
            None => cum[i] = local[i],
        }
    }

    (cum, backlink)
}

/// Last local maximum of the cumulative score above half the median peak score
fn last_beat(cum: &[f32]) -> usize {
    let n = cum.len();
    let maxima: Vec<usize> = (1..n)
        .filter(|&i| cum[i] > cum[i - 1] && (i + 1 == n || cum[i] >= cum[i + 1]))
        .collect();

    if maxima.is_empty() {
        return cum
            .iter()
            .enumerate()
            .fold(0, |best, (i, &v)| if v > cum[best] { i } else { best });
    }

    let peak_scores: Vec<f32> = maxima.iter().map(|&i| cum[i]).collect();
    let threshold = 0.5 * median(&peak_scores);

    maxima
        .iter()
        .rev()
        .copied()
        .find(|&i| cum[i] >= threshold)
        .unwrap_or(maxima[maxima.len() - 1])
}

/// Drop leading and trailing beats whose local score is below half the RMS
fn trim_beats(local: &[f32], frames: Vec<usize>) -> Vec<usize> {
    if frames.is_empty() {
        return frames;
    }
    let scores: Vec<f32> = frames.iter().map(|&f| local[f]).collect();
    let rms = (scores.iter().map(|s| s * s).sum::<f32>() / scores.len() as f32).sqrt();
    let threshold = 0.5 * rms;

    let first = scores.iter().position(|&s| s >= threshold);
    let last = scores.iter().rposition(|&s| s >= threshold);
    match (first, last) {
        (Some(a), Some(b)) => frames[a..=b].to_vec(),
        _ => Vec::new(),
    }
}
