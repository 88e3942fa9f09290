//! Spectral engine: windowing, radix-2 FFT and STFT
//!
//! # Example
//!
//! ```
//! use loopscope_dsp::config::StftConfig;
//! use loopscope_dsp::features::spectral::stft;
//!
//! let samples = vec![0.0f32; 8192];
//! let spec = stft(&samples, 44100, &StftConfig::default(), false)?;
//! assert_eq!(spec.n_frames(), 13);
//! # Ok::<(), loopscope_dsp::AnalysisError>(())
//! ```

pub mod fft;
pub mod stft;
pub mod window;

pub use stft::stft;

use crate::parallel::map_indices;
use rustfft::num_complex::Complex;

/// Non-redundant FFT bins of one analysis frame
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    /// Bins `0..=fft_size/2`
    pub bins: Vec<Complex<f32>>,
}

impl SpectralFrame {
    /// Magnitude of every bin
    pub fn magnitude(&self) -> Vec<f32> {
        self.bins.iter().map(|c| c.norm()).collect()
    }
}

/// STFT of a signal
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// One entry per analysis frame
    pub frames: Vec<SpectralFrame>,
    /// FFT size (power of two >= `frame_length`)
    pub fft_size: usize,
    /// Frame length in samples
    pub frame_length: usize,
    /// Hop length in samples
    pub hop_length: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Spectrogram {
    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Bins per frame
    pub fn n_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_length as f32
    }

    /// Center frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    /// Magnitude matrix `[frame][bin]`
    pub fn magnitudes(&self, parallel: bool) -> Vec<Vec<f32>> {
        map_indices(self.frames.len(), parallel, |i| self.frames[i].magnitude())
    }
}
