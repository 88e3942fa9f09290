//! Normalized autocorrelation of the onset envelope
//!
//! # Algorithm
//!
//! 1. Center the envelope and divide by its standard deviation
//! 2. Zero-pad to at least twice its length so the circular correlation
//!    does not wrap, then `ACF = IFFT(|FFT(x)|²)`
//! 3. Divide by lag 0 so `ACF[0] == 1`
//! 4. Convert the BPM bounds to a lag window:
//!    `min_lag = ceil(60·sr / (max_bpm·hop))`, `max_lag = floor(60·sr / (min_bpm·hop))`
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use crate::features::spectral::fft::{Radix2Fft, COMPLEX_ZERO};
use rustfft::num_complex::Complex;

pub(crate) const EPSILON: f32 = 1e-10;

/// Normalized autocorrelation with its BPM search window
#[derive(Debug, Clone, PartialEq)]
pub struct Tempogram {
    /// `acf[lag]` for lag in `0..acf.len()`, `acf[0] == 1`
    pub acf: Vec<f32>,
    /// Shortest lag searched (fastest tempo)
    pub min_lag: usize,
    /// Longest lag searched (slowest tempo)
    pub max_lag: usize,
}

impl Tempogram {
    /// ACF value at a fractional lag (linear interpolation, 0 outside)
    pub fn value_at(&self, lag: f32) -> f32 {
        if lag < 0.0 {
            return 0.0;
        }
        let i = lag.floor() as usize;
        let frac = lag - i as f32;
        match (self.acf.get(i), self.acf.get(i + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * frac,
            (Some(&a), None) => a,
            _ => 0.0,
        }
    }
}

/// Center and scale to unit standard deviation
///
/// Returns `None` for an empty or constant signal.
pub fn standardize(values: &[f32]) -> Option<Vec<f32>> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std < EPSILON as f64 {
        return None;
    }
    Some(values.iter().map(|&v| ((v as f64 - mean) / std) as f32).collect())
}

/// Autocorrelation for lags `0..=max_lag`, normalized by lag 0
///
/// Lags beyond the signal length are zero. An all-zero signal gives an
/// all-zero result.
pub fn autocorrelation(signal: &[f32], max_lag: usize) -> Vec<f32> {
    let n = signal.len();
    let mut acf = vec![0.0f32; max_lag + 1];
    if n == 0 {
        return acf;
    }

    let plan = Radix2Fft::new(2 * n);
    let mut spectrum = plan.forward_real(signal);
    for x in &mut spectrum {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }
    let raw = plan.inverse(&spectrum);

    let zero_lag = raw.first().copied().unwrap_or(COMPLEX_ZERO).re;
    if zero_lag.abs() < EPSILON {
        return acf;
    }
    for (lag, value) in acf.iter_mut().enumerate().take(n) {
        *value = raw[lag].re / zero_lag;
    }
    acf
}

/// Lag window `[min_lag, max_lag]` in frames for a BPM range
pub fn lag_range(sample_rate: u32, hop_length: usize, min_bpm: f32, max_bpm: f32) -> (usize, usize) {
    let frames_per_minute = 60.0 * sample_rate as f32 / hop_length as f32;
    let min_lag = (frames_per_minute / max_bpm).ceil().max(1.0) as usize;
    let max_lag = (frames_per_minute / min_bpm).floor().max(0.0) as usize;
    (min_lag, max_lag)
}

/// Build the tempogram of an onset envelope
///
/// The lag window is clamped so every lag in it has a right neighbour for
/// peak interpolation. Returns `None` when the envelope is flat or too short
/// to contain a single lag of the window.
pub fn tempogram(
    envelope: &[f32],
    sample_rate: u32,
    hop_length: usize,
    min_bpm: f32,
    max_bpm: f32,
) -> Option<Tempogram> {
    let (min_lag, max_lag) = lag_range(sample_rate, hop_length, min_bpm, max_bpm);
    let max_lag = max_lag.min(envelope.len().saturating_sub(2));
    if min_lag > max_lag {
        log::debug!(
            "Envelope of {} frames too short for lag window starting at {}",
            envelope.len(),
            min_lag
        );
        return None;
    }

    let normalized = standardize(envelope)?;
    let acf = autocorrelation(&normalized, max_lag + 1);

    log::debug!(
        "Tempogram: {} frames, lags [{}, {}]",
        envelope.len(),
        min_lag,
        max_lag
    );

    Some(Tempogram {
        acf,
        min_lag,
        max_lag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autocorrelation_matches_direct() {
        let signal: Vec<f32> = (0..50).map(|i| ((i * 7) % 11) as f32 - 5.0).collect();
        let acf = autocorrelation(&signal, 20);

        let direct = |lag: usize| -> f32 {
            (0..signal.len() - lag).map(|i| signal[i] * signal[i + lag]).sum()
        };
        let zero = direct(0);
        for lag in 0..=20 {
            assert!(
                (acf[lag] - direct(lag) / zero).abs() < 1e-4,
                "lag {}: {} vs {}",
                lag,
                acf[lag],
                direct(lag) / zero
            );
        }
    }

    #[test]
    fn test_autocorrelation_zero_signal() {
        let acf = autocorrelation(&[0.0; 32], 10);
        assert!(acf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_lag_range_default_bpm_bounds() {
        // 44.1 kHz, hop 512: 5167.97 frames per minute
        assert_eq!(lag_range(44100, 512, 60.0, 200.0), (26, 86));
    }

    #[test]
    fn test_standardize_constant_is_none() {
        assert!(standardize(&[3.0; 10]).is_none());
        assert!(standardize(&[]).is_none());
    }

    #[test]
    fn test_tempogram_periodic_peak() {
        let mut env = vec![0.0f32; 400];
        for i in (0..400).step_by(40) {
            env[i] = 1.0;
        }
        let tg = tempogram(&env, 44100, 512, 60.0, 200.0).unwrap();
        assert!((tg.acf[0] - 1.0).abs() < 1e-5);
        let best = (tg.min_lag..=tg.max_lag)
            .max_by(|&a, &b| tg.acf[a].partial_cmp(&tg.acf[b]).unwrap())
            .unwrap();
        assert_eq!(best, 40);
    }

    #[test]
    fn test_tempogram_too_short() {
        assert!(tempogram(&[0.0, 1.0, 0.0, 1.0], 44100, 512, 60.0, 200.0).is_none());
    }

    #[test]
    fn test_value_at_interpolates() {
        let tg = Tempogram {
            acf: vec![1.0, 0.5, 0.0],
            min_lag: 1,
            max_lag: 1,
        };
        assert!((tg.value_at(0.5) - 0.75).abs() < 1e-6);
        assert_eq!(tg.value_at(2.0), 0.0);
        assert_eq!(tg.value_at(5.0), 0.0);
    }
}
