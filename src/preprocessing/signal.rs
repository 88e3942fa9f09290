//! Validated mono input signal

use crate::error::AnalysisError;

/// Mono PCM samples with their sample rate
///
/// Construction rejects empty buffers, a zero sample rate and buffers with
/// no finite sample; any NaN or ±Inf sample is replaced by 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Signal {
    /// Validate and sanitize a sample buffer
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an empty buffer, a zero
    /// sample rate, or a buffer in which every sample is NaN or infinite.
    pub fn new(samples: &[f32], sample_rate: u32) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
        }

        let non_finite = samples.iter().filter(|s| !s.is_finite()).count();
        if non_finite == samples.len() {
            return Err(AnalysisError::InvalidInput(
                "All samples are NaN or infinite".to_string(),
            ));
        }
        if non_finite > 0 {
            log::warn!("Replaced {} non-finite samples with 0", non_finite);
        }

        let samples = samples
            .iter()
            .map(|&s| if s.is_finite() { s } else { 0.0 })
            .collect();

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Sanitized samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed signal
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}
