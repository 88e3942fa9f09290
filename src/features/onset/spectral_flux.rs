//! Spectral flux onset strength
//!
//! Algorithm:
//! 1. Take the magnitude spectrum of every STFT frame
//! 2. For each frame i > 0, sum the positive magnitude increases over the
//!    previous frame: `flux[i] = Σ_k max(0, |X_i[k]| - |X_{i-1}[k]|)`
//! 3. `flux[0] = 0`
//!
//! The envelope is left unnormalized; tempo estimation and beat tracking
//! normalize it themselves.

use super::OnsetEnvelope;
use crate::error::AnalysisError;
use crate::features::spectral::Spectrogram;

/// Compute the onset-strength envelope of a spectrogram
///
/// The envelope has exactly one value per STFT frame.
pub fn onset_strength(spectrogram: &Spectrogram, parallel: bool) -> OnsetEnvelope {
    let magnitudes = spectrogram.magnitudes(parallel);
    // Every frame of a Spectrogram has n_bins bins, so this cannot fail
    let values = flux(&magnitudes);

    log::debug!(
        "Onset envelope: {} frames, peak {:.3}",
        values.len(),
        values.iter().cloned().fold(0.0f32, f32::max)
    );

    OnsetEnvelope {
        values,
        sample_rate: spectrogram.sample_rate,
        hop_length: spectrogram.hop_length,
    }
}

/// Spectral flux over a precomputed magnitude matrix `[frame][bin]`
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if frames have different bin counts.
pub fn spectral_flux(magnitudes: &[Vec<f32>]) -> Result<Vec<f32>, AnalysisError> {
    if let Some(first) = magnitudes.first() {
        let n_bins = first.len();
        if let Some((i, frame)) = magnitudes.iter().enumerate().find(|(_, f)| f.len() != n_bins) {
            return Err(AnalysisError::ProcessingError(format!(
                "Inconsistent frame length: frame {} has {} bins, expected {}",
                i,
                frame.len(),
                n_bins
            )));
        }
    }
    Ok(flux(magnitudes))
}

fn flux(magnitudes: &[Vec<f32>]) -> Vec<f32> {
    let mut values = vec![0.0f32; magnitudes.len()];
    for i in 1..magnitudes.len() {
        values[i] = magnitudes[i]
            .iter()
            .zip(magnitudes[i - 1].iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();
    }
    values
}
