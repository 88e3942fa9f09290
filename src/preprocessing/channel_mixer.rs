//! Channel mixing (multichannel to mono)

use crate::error::AnalysisError;

/// Average interleaved multichannel frames down to mono
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for zero channels or a buffer that
/// is not a whole number of frames.
pub fn downmix_interleaved(samples: &[f32], channels: usize) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput("Channel count must be > 0".to_string()));
    }
    if samples.len() % channels != 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "{} samples is not a multiple of {} channels",
            samples.len(),
            channels
        )));
    }
    if channels == 1 {
        return Ok(samples.to_vec());
    }

    log::debug!("Downmixing {} channels to mono", channels);
    let scale = 1.0 / channels as f32;
    Ok(samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}
