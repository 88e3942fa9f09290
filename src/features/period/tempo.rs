//! Global tempo estimation from the onset envelope
//!
//! # Algorithm
//!
//! 1. Tempogram: normalized autocorrelation over the BPM lag window
//! 2. Local maxima whose downhill-walk prominence reaches
//!    `min_prominence` × the largest autocorrelation value in the window
//! 3. Parabolic sub-lag refinement, `BPM = 60·sr / (lag·hop)`
//! 4. Common-tempo prior: `score = strength · (1 + boost · max_c(1 - |bpm - c| / width)⁺)`
//! 5. Octave correction on the best candidate
//! 6. Clamp to `[min_bpm, max_bpm]`
//!
//! With no prominent peak the strongest lag in the window is used
//! (`used_fallback`); a flat or too-short envelope yields the default tempo
//! with confidence 0.

use super::autocorrelation::{tempogram, Tempogram, EPSILON};
use super::peak_picking::{find_prominent_peaks, refine_peak};
use super::{TempoCandidate, TempoEstimate};
use crate::config::{OctaveCorrection, TempoConfig, TempoPrior};
use crate::error::AnalysisError;

/// Estimate the global tempo of an onset envelope
///
/// # Arguments
///
/// * `envelope` - Onset-strength envelope (one value per frame)
/// * `sample_rate` - Sample rate in Hz
/// * `hop_length` - Hop length in samples
/// * `config` - BPM bounds, prior and octave correction
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop length,
/// or an invalid BPM range. A silent or periodicity-free envelope is not an
/// error.
///
/// # Example
///
/// ```
/// use loopscope_dsp::config::TempoConfig;
/// use loopscope_dsp::features::period::estimate_tempo;
///
/// let mut envelope = vec![0.0f32; 800];
/// for i in (0..800).step_by(43) {
///     envelope[i] = 1.0;
/// }
/// let tempo = estimate_tempo(&envelope, 44100, 512, &TempoConfig::default())?;
/// assert!((tempo.bpm - 120.0).abs() < 1.0);
/// # Ok::<(), loopscope_dsp::AnalysisError>(())
/// ```
pub fn estimate_tempo(
    envelope: &[f32],
    sample_rate: u32,
    hop_length: usize,
    config: &TempoConfig,
) -> Result<TempoEstimate, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }
    if hop_length == 0 {
        return Err(AnalysisError::InvalidInput("Invalid hop size: 0".to_string()));
    }
    if !(config.min_bpm > 0.0 && config.min_bpm < config.max_bpm) {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}]",
            config.min_bpm, config.max_bpm
        )));
    }

    log::debug!(
        "Estimating tempo: {} frames, {} Hz, hop={}, range=[{:.1}, {:.1}] BPM",
        envelope.len(),
        sample_rate,
        hop_length,
        config.min_bpm,
        config.max_bpm
    );

    let default_bpm = config.default_bpm.clamp(config.min_bpm, config.max_bpm);
    let tg = match tempogram(envelope, sample_rate, hop_length, config.min_bpm, config.max_bpm) {
        Some(tg) => tg,
        None => {
            log::warn!(
                "No periodicity in onset envelope, using default tempo {:.1} BPM",
                default_bpm
            );
            return Ok(TempoEstimate::fallback(default_bpm));
        }
    };

    let frames_per_minute = 60.0 * sample_rate as f32 / hop_length as f32;
    let acf = &tg.acf;
    let window = &acf[tg.min_lag..=tg.max_lag];
    let global_max = window.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut scored: Vec<(f32, f32, f32)> = Vec::new(); // (lag, strength, score)
    if global_max > EPSILON {
        let min_prominence = config.min_prominence * global_max;
        for peak in find_prominent_peaks(acf, tg.min_lag, tg.max_lag, min_prominence) {
            let lag = refine_peak(acf, peak.index);
            let strength = peak.value.clamp(0.0, 1.0);
            let score = strength * (1.0 + prior_bump(&config.prior, frames_per_minute / lag));
            scored.push((lag, strength, score));
        }
    }
    scored.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
    });

    let candidates: Vec<TempoCandidate> = scored
        .iter()
        .map(|&(lag, strength, _)| TempoCandidate {
            bpm: (frames_per_minute / lag).clamp(config.min_bpm, config.max_bpm),
            strength,
        })
        .collect();

    let (best_lag, best_strength, used_fallback) = match scored.first() {
        Some(&(lag, strength, _)) => (lag, strength, false),
        None => {
            // First maximum wins ties
            let mut best = tg.min_lag;
            for lag in tg.min_lag..=tg.max_lag {
                if acf[lag] > acf[best] {
                    best = lag;
                }
            }
            log::warn!(
                "No prominent autocorrelation peak, using strongest lag {} ({:.3})",
                best,
                acf[best]
            );
            (refine_peak(acf, best), acf[best].clamp(0.0, 1.0), true)
        }
    };

    let (lag, confidence) = correct_octave(
        &tg,
        &config.octave,
        best_lag,
        best_strength,
        frames_per_minute,
        config.min_bpm,
    );
    let bpm = (frames_per_minute / lag).clamp(config.min_bpm, config.max_bpm);

    log::debug!(
        "Tempo: {:.2} BPM (lag {:.2}, confidence {:.3}, {} candidates{})",
        bpm,
        lag,
        confidence,
        candidates.len(),
        if used_fallback { ", fallback" } else { "" }
    );

    Ok(TempoEstimate {
        bpm,
        confidence,
        candidates,
        used_fallback,
    })
}

/// Relative boost of the common-tempo prior at `bpm` (0 when disabled)
pub fn prior_bump(prior: &TempoPrior, bpm: f32) -> f32 {
    if !prior.enabled || prior.width_bpm <= 0.0 {
        return 0.0;
    }
    let closeness = prior
        .centers
        .iter()
        .map(|&c| (1.0 - (bpm - c).abs() / prior.width_bpm).max(0.0))
        .fold(0.0f32, f32::max);
    prior.boost * closeness
}

/// Apply octave correction, returning the corrected lag and its strength
fn correct_octave(
    tg: &Tempogram,
    octave: &OctaveCorrection,
    lag: f32,
    strength: f32,
    frames_per_minute: f32,
    min_bpm: f32,
) -> (f32, f32) {
    if !octave.enabled {
        return (lag, strength);
    }
    let bpm = frames_per_minute / lag;

    if bpm < octave.double_below_bpm {
        let half = lag / 2.0;
        let half_strength = tg.value_at(half);
        if half >= tg.min_lag as f32 && half_strength >= octave.double_strength_ratio * strength {
            log::debug!(
                "Octave correction: {:.1} -> {:.1} BPM (ACF {:.3} vs {:.3})",
                bpm,
                bpm * 2.0,
                half_strength,
                strength
            );
            return (half, half_strength.clamp(0.0, 1.0));
        }
    } else if bpm > octave.halve_above_bpm && bpm / 2.0 >= min_bpm {
        log::debug!("Octave correction: {:.1} -> {:.1} BPM", bpm, bpm / 2.0);
        return (lag * 2.0, strength);
    }

    (lag, strength)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_envelope(n: usize, period: f32) -> Vec<f32> {
        let mut env = vec![0.0f32; n];
        let mut t = 0.0f32;
        while (t as usize) < n {
            env[t.round() as usize % n] = 1.0;
            t += period;
        }
        env
    }

    #[test]
    fn test_120_bpm_pulse() {
        // 43.07 frames per beat at 44.1 kHz / hop 512
        let env = pulse_envelope(1000, 43.066);
        let tempo = estimate_tempo(&env, 44100, 512, &TempoConfig::default()).unwrap();
        assert!((tempo.bpm - 120.0).abs() < 1.0, "got {:.2}", tempo.bpm);
        assert!(tempo.confidence > 0.5);
        assert!(!tempo.used_fallback);
        assert!(!tempo.candidates.is_empty());
    }

    #[test]
    fn test_silence_gives_default_with_zero_confidence() {
        let tempo = estimate_tempo(&[0.0; 500], 44100, 512, &TempoConfig::default()).unwrap();
        assert_eq!(tempo.bpm, 120.0);
        assert_eq!(tempo.confidence, 0.0);
        assert!(tempo.used_fallback);
    }

    #[test]
    fn test_too_short_envelope_gives_default() {
        let tempo = estimate_tempo(&[0.0, 1.0, 0.0, 1.0], 44100, 512, &TempoConfig::default()).unwrap();
        assert_eq!(tempo.bpm, 120.0);
        assert_eq!(tempo.confidence, 0.0);
    }

    #[test]
    fn test_no_prominent_peak_uses_strongest_lag() {
        // A ramp has a monotonically decaying autocorrelation: no peaks
        let env: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let config = TempoConfig::default();
        let tempo = estimate_tempo(&env, 44100, 512, &config).unwrap();

        assert!(tempo.used_fallback);
        assert!(tempo.candidates.is_empty());
        assert!(tempo.confidence > 0.0);
        assert!(
            tempo.bpm >= config.min_bpm && tempo.bpm <= config.max_bpm,
            "got {:.2}",
            tempo.bpm
        );
    }

    #[test]
    fn test_bpm_always_within_bounds() {
        let config = TempoConfig {
            min_bpm: 100.0,
            max_bpm: 140.0,
            ..TempoConfig::default()
        };
        for period in [20.0, 30.0, 43.0, 60.0, 90.0] {
            let env = pulse_envelope(1200, period);
            let tempo = estimate_tempo(&env, 44100, 512, &config).unwrap();
            assert!(
                tempo.bpm >= 100.0 && tempo.bpm <= 140.0,
                "period {} gave {:.2}",
                period,
                tempo.bpm
            );
        }
    }

    #[test]
    fn test_slow_pulse_doubled_by_octave_correction() {
        // 72 frames ≈ 71.8 BPM; pulses with a softer offbeat at 36 frames
        let mut env = vec![0.0f32; 1500];
        for i in (0..1500).step_by(72) {
            env[i] = 1.0;
            if i + 36 < 1500 {
                env[i + 36] = 0.9;
            }
        }
        let mut config = TempoConfig::default();
        config.prior.enabled = false;
        let tempo = estimate_tempo(&env, 44100, 512, &config).unwrap();
        assert!((tempo.bpm - 143.6).abs() < 2.0, "got {:.2}", tempo.bpm);
    }

    #[test]
    fn test_fast_pulse_halved() {
        // 30 frames ≈ 172 BPM
        let env = pulse_envelope(1500, 30.0);
        let mut config = TempoConfig::default();
        config.prior.enabled = false;
        let tempo = estimate_tempo(&env, 44100, 512, &config).unwrap();
        assert!((tempo.bpm - 86.1).abs() < 1.5, "got {:.2}", tempo.bpm);

        config.octave.enabled = false;
        let raw = estimate_tempo(&env, 44100, 512, &config).unwrap();
        assert!((raw.bpm - 172.3).abs() < 2.0, "got {:.2}", raw.bpm);
    }

    #[test]
    fn test_prior_bump() {
        let prior = TempoPrior::default();
        assert!((prior_bump(&prior, 128.0) - 0.15).abs() < 1e-6);
        assert!((prior_bump(&prior, 130.5) - 0.075).abs() < 1e-6);
        assert_eq!(prior_bump(&prior, 190.0), 0.0);

        let disabled = TempoPrior {
            enabled: false,
            ..TempoPrior::default()
        };
        assert_eq!(prior_bump(&disabled, 128.0), 0.0);
    }

    #[test]
    fn test_invalid_parameters() {
        let config = TempoConfig::default();
        assert!(estimate_tempo(&[0.0; 100], 0, 512, &config).is_err());
        assert!(estimate_tempo(&[0.0; 100], 44100, 0, &config).is_err());
        let bad = TempoConfig {
            min_bpm: 200.0,
            max_bpm: 100.0,
            ..TempoConfig::default()
        };
        assert!(estimate_tempo(&[0.0; 100], 44100, 512, &bad).is_err());
    }
}
