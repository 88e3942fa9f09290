//! Chroma vector extraction
//!
//! Folds the power spectrum of every STFT frame onto 12 pitch classes
//! (C = 0, C# = 1, ..., B = 11).
//!
//! # Algorithm
//!
//! 1. For each FFT bin between `fmin_hz` and `fmax_hz`, compute its MIDI
//!    pitch `m = 12·log2(f / tuning) + 69`
//! 2. Hard mapping: all energy goes to `round(m) mod 12`. Soft mapping:
//!    energy is spread over the pitch classes with Gaussian weights on the
//!    circular semitone distance, normalized to sum to 1
//! 3. Sum `|X[k]|²·weight` per pitch class
//! 4. Per-frame max normalization, optional temporal smoothing

use super::normalization::normalize_max;
use super::smoothing::smooth_chroma;
use crate::config::ChromaConfig;
use crate::error::AnalysisError;
use crate::parallel::map_indices;

/// Number of pitch classes
pub const N_CHROMA: usize = 12;

/// Sparse bin → pitch-class weights
#[derive(Debug, Clone)]
pub struct ChromaFilterbank {
    /// `(bin, weights)` for every bin inside the frequency range
    bins: Vec<(usize, [f32; N_CHROMA])>,
}

impl ChromaFilterbank {
    /// Build the filterbank for spectra of `n_bins` bins from an FFT of `fft_size`
    pub fn new(n_bins: usize, fft_size: usize, sample_rate: u32, config: &ChromaConfig) -> Self {
        let bin_hz = sample_rate as f32 / fft_size as f32;
        let bins = (1..n_bins)
            .filter_map(|k| {
                let freq = k as f32 * bin_hz;
                if freq < config.fmin_hz || freq > config.fmax_hz {
                    return None;
                }
                let midi = 12.0 * (freq / config.tuning_hz).log2() + 69.0;
                Some((k, pitch_class_weights(midi, config)))
            })
            .collect();
        Self { bins }
    }

    /// Fold one magnitude frame into an unnormalized chroma vector
    pub fn apply(&self, magnitudes: &[f32]) -> [f32; N_CHROMA] {
        let mut chroma = [0.0f32; N_CHROMA];
        for (k, weights) in &self.bins {
            let power = magnitudes[*k] * magnitudes[*k];
            if power == 0.0 {
                continue;
            }
            for (c, w) in chroma.iter_mut().zip(weights.iter()) {
                *c += power * w;
            }
        }
        chroma
    }
}

fn pitch_class_weights(midi: f32, config: &ChromaConfig) -> [f32; N_CHROMA] {
    let mut weights = [0.0f32; N_CHROMA];
    if !config.soft_mapping {
        let pc = (midi.round() as i64).rem_euclid(N_CHROMA as i64) as usize;
        weights[pc] = 1.0;
        return weights;
    }

    let pc = midi.rem_euclid(N_CHROMA as f32);
    let sigma = config.soft_mapping_sigma;
    for (c, w) in weights.iter_mut().enumerate() {
        let d = (pc - c as f32).abs();
        let d = d.min(N_CHROMA as f32 - d);
        *w = (-0.5 * (d / sigma).powi(2)).exp();
    }
    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for w in &mut weights {
            *w /= sum;
        }
    }
    weights
}

/// Extract max-normalized chroma vectors from a magnitude spectrogram
///
/// # Arguments
///
/// * `magnitudes` - Magnitude frames `[frame][bin]`, `fft_size / 2 + 1` bins each
/// * `sample_rate` - Sample rate in Hz
/// * `fft_size` - FFT size the magnitudes were computed with
/// * `config` - Tuning, frequency range, mapping and smoothing
/// * `parallel` - Compute frames on the rayon pool
///
/// # Returns
///
/// One 12-element chroma vector per frame. Silent frames stay all-zero.
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if a frame does not have
/// `fft_size / 2 + 1` bins.
pub fn extract_chroma(
    magnitudes: &[Vec<f32>],
    sample_rate: u32,
    fft_size: usize,
    config: &ChromaConfig,
    parallel: bool,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    let n_bins = fft_size / 2 + 1;
    if let Some((i, frame)) = magnitudes.iter().enumerate().find(|(_, f)| f.len() != n_bins) {
        return Err(AnalysisError::ProcessingError(format!(
            "Inconsistent frame length: frame {} has {} bins, expected {}",
            i,
            frame.len(),
            n_bins
        )));
    }

    log::debug!(
        "Extracting chroma: {} frames, fft={}, {:.0}-{:.0} Hz",
        magnitudes.len(),
        fft_size,
        config.fmin_hz,
        config.fmax_hz
    );

    let filterbank = ChromaFilterbank::new(n_bins, fft_size, sample_rate, config);

    let chroma = map_indices(magnitudes.len(), parallel, |i| {
        let mut frame = filterbank.apply(&magnitudes[i]).to_vec();
        normalize_max(&mut frame);
        frame
    });

    Ok(smooth_chroma(&chroma, config.smoothing_window))
}
