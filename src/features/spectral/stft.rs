//! Short-time Fourier transform
//!
//! Algorithm:
//! 1. Slice the signal into `frame_length` frames every `hop_length` samples
//!    (no centering, no end padding)
//! 2. Multiply each frame by the analysis window
//! 3. Zero-pad to the next power of two and run the radix-2 FFT
//! 4. Keep the `fft_size / 2 + 1` non-redundant bins
//!
//! Frames are independent, so they are computed per index on the rayon pool
//! and collected in order.

use super::fft::Radix2Fft;
use super::window::generate_window;
use super::{SpectralFrame, Spectrogram};
use crate::config::StftConfig;
use crate::error::AnalysisError;
use crate::parallel::map_indices;

/// Number of full frames that fit in `len` samples
pub fn frame_count(len: usize, frame_length: usize, hop_length: usize) -> usize {
    if len < frame_length || hop_length == 0 {
        0
    } else {
        (len - frame_length) / hop_length + 1
    }
}

/// Compute the STFT of a mono signal
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Frame length, hop length and window
/// * `parallel` - Compute frames on the rayon pool
///
/// # Errors
///
/// Returns `AnalysisError::InsufficientData` if the signal is shorter than one
/// frame, or `InvalidInput` for a zero hop or frame length.
pub fn stft(
    samples: &[f32],
    sample_rate: u32,
    config: &StftConfig,
    parallel: bool,
) -> Result<Spectrogram, AnalysisError> {
    let frame_length = config.frame_length;
    let hop_length = config.hop_length;

    if frame_length == 0 || hop_length == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "frame_length and hop_length must be > 0, got {} / {}",
            frame_length, hop_length
        )));
    }
    if samples.len() < frame_length {
        return Err(AnalysisError::InsufficientData {
            provided: samples.len(),
            minimum: frame_length,
        });
    }

    let n_frames = frame_count(samples.len(), frame_length, hop_length);
    let window = generate_window(config.window, frame_length);
    let plan = Radix2Fft::new(frame_length);
    let fft_size = plan.size();
    let n_bins = fft_size / 2 + 1;

    log::debug!(
        "STFT: {} samples, {} frames (frame={}, hop={}, fft={})",
        samples.len(),
        n_frames,
        frame_length,
        hop_length,
        fft_size
    );

    let frames = map_indices(n_frames, parallel, |i| {
        let start = i * hop_length;
        let windowed: Vec<f32> = samples[start..start + frame_length]
            .iter()
            .zip(window.iter())
            .map(|(s, w)| s * w)
            .collect();
        let mut bins = plan.forward_real(&windowed);
        bins.truncate(n_bins);
        SpectralFrame { bins }
    });

    Ok(Spectrogram {
        frames,
        fft_size,
        frame_length,
        hop_length,
        sample_rate,
    })
}
