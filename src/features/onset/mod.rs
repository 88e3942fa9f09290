//! Onset detection
//!
//! - Spectral flux onset-strength envelope
//! - Adaptive-threshold (median + MAD) onset peak picking

pub mod spectral_flux;
pub mod threshold;

pub use spectral_flux::onset_strength;
pub use threshold::pick_onsets;

/// Onset-strength envelope: one non-negative value per STFT frame
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetEnvelope {
    /// Envelope values, `values[0] == 0`
    pub values: Vec<f32>,
    /// Sample rate of the analysed signal in Hz
    pub sample_rate: u32,
    /// Hop length between frames in samples
    pub hop_length: usize,
}

impl OnsetEnvelope {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the envelope has no frames
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_length as f32
    }

    /// Time of frame `i` in seconds (`i * hop / sr`)
    pub fn frame_to_seconds(&self, i: usize) -> f32 {
        (i * self.hop_length) as f32 / self.sample_rate as f32
    }
}
