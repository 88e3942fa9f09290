//! Recurrence-based loop candidate detection
//!
//! # Algorithm
//!
//! 1. Chroma per STFT frame, decimated by averaging so at most
//!    `max_frames` frames remain
//! 2. Time-delay embedding of the chroma sequence
//! 3. kNN recurrence matrix (cosine similarity)
//! 4. Lag matrix and lag energy (sum over both diagonals per lag)
//! 5. Peaks of the lag energy between the shortest and longest loop length
//!    (longest also capped at half the signal) → loop lengths, with
//!    parabolic sub-frame refinement and confidence = height / highest peak
//! 6. For each length, the start is the earliest frame whose one-loop window
//!    of chroma similarity at that lag reaches `start_tolerance` of the best
//!    window
//!
//! # Reference
//!
//! Serrà, J., Müller, M., Grosche, P., & Arcos, J. L. (2014). Unsupervised
//! Music Structure Annotation by Time Series Structure Features and
//! Segment Similarity. *IEEE Transactions on Multimedia*, 16(5).

pub mod embedding;
pub mod lag;
pub mod recurrence;

use crate::config::{StftConfig, StructureConfig};
use crate::error::AnalysisError;
use crate::features::chroma::extract_chroma;
use crate::features::chroma::smoothing::decimate;
use crate::features::period::peak_picking::{find_peaks_in_range, refine_peak};
use crate::features::spectral::stft;
use embedding::stack_memory;
use lag::LagMatrix;
use recurrence::{cosine_similarity, recurrence_matrix};
use serde::{Deserialize, Serialize};

const EPSILON: f32 = 1e-10;

/// A candidate loop region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopCandidate {
    /// First STFT frame of the loop
    pub start_frame: usize,
    /// STFT frame one loop length after the start
    pub end_frame: usize,
    /// First sample of the loop
    pub start_sample: usize,
    /// One past the last sample of the loop
    pub end_sample: usize,
    /// Loop length in seconds
    pub length_seconds: f32,
    /// Waveform correlation with the following audio (0 until refined)
    pub correlation: f32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Lag-energy height relative to the strongest loop length (0.0-1.0)
    pub structural_confidence: f32,
    /// Loop length or boundaries line up with the musical grid
    pub is_musical_boundary: bool,
}

impl LoopCandidate {
    /// Loop length in samples
    pub fn length_samples(&self) -> usize {
        self.end_sample - self.start_sample
    }
}

/// Find ranked loop candidates from a magnitude spectrogram
///
/// # Arguments
///
/// * `magnitudes` - STFT magnitude frames `[frame][bin]`
/// * `sample_rate` - Sample rate in Hz
/// * `fft_size` - FFT size of the magnitudes
/// * `hop_length` - Hop length in samples
/// * `config` - Chroma, embedding, recurrence and peak parameters
/// * `parallel` - Compute chroma frames and recurrence rows on the rayon pool
///
/// # Returns
///
/// At most `top_k` candidates, highest confidence first. Silent or
/// non-repeating material yields an empty list.
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the magnitude frames do not
/// match `fft_size`.
pub fn find_loop_candidates(
    magnitudes: &[Vec<f32>],
    sample_rate: u32,
    fft_size: usize,
    hop_length: usize,
    config: &StructureConfig,
    parallel: bool,
) -> Result<Vec<LoopCandidate>, AnalysisError> {
    if sample_rate == 0 || hop_length == 0 {
        return Err(AnalysisError::InvalidInput(
            "sample_rate and hop_length must be > 0".to_string(),
        ));
    }

    let chroma = extract_chroma(magnitudes, sample_rate, fft_size, &config.chroma, parallel)?;
    let (features, factor) = decimate(&chroma, config.max_frames);
    let n = features.len();
    let frame_rate = sample_rate as f32 / (hop_length * factor) as f32;

    let min_lag = ((config.min_loop_seconds * frame_rate).ceil() as usize).max(config.width).max(1);
    let max_lag = ((config.max_loop_seconds * frame_rate).floor() as usize).min(n / 2);
    log::debug!(
        "Structure analysis: {} feature frames (decimation {}), lag window [{}, {}]",
        n,
        factor,
        min_lag,
        max_lag
    );
    if min_lag > max_lag {
        log::debug!("Signal too short for the loop length range");
        return Ok(vec![]);
    }

    let embedded = stack_memory(&features, config.embedding_steps, config.embedding_delay);
    let rec = recurrence_matrix(
        &embedded,
        config.mode,
        config.width,
        config.k,
        config.symmetric,
        parallel,
    );
    let energy = LagMatrix::from_recurrence(&rec).lag_energy();

    let min_distance = (min_lag / 2).max(1);
    let peaks = find_peaks_in_range(&energy, min_lag, max_lag, config.peak_threshold, min_distance);
    let highest = match peaks.first() {
        Some(&(_, v)) if v > EPSILON => v,
        _ => {
            log::debug!("No repetition peaks in lag energy");
            return Ok(vec![]);
        }
    };

    let mut candidates: Vec<(f32, LoopCandidate)> = peaks
        .iter()
        .map(|&(index, value)| {
            let lag = refine_peak(&energy, index);
            let start = start_frame(&features, index, config.start_tolerance);

            let start_frame = start * factor;
            let length_frames = lag * factor as f32;
            let start_sample = start_frame * hop_length;
            let length_samples = (length_frames * hop_length as f32).round() as usize;
            let confidence = (value / highest).clamp(0.0, 1.0);

            let candidate = LoopCandidate {
                start_frame,
                end_frame: start_frame + length_frames.round() as usize,
                start_sample,
                end_sample: start_sample + length_samples,
                length_seconds: length_samples as f32 / sample_rate as f32,
                correlation: 0.0,
                confidence,
                structural_confidence: confidence,
                is_musical_boundary: false,
            };
            (lag, candidate)
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.1.confidence
            .partial_cmp(&a.1.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
    });
    candidates.truncate(config.top_k);

    log::debug!(
        "Found {} loop candidates (best {:.2}s)",
        candidates.len(),
        candidates.first().map(|c| c.1.length_seconds).unwrap_or(0.0)
    );

    Ok(candidates.into_iter().map(|(_, c)| c).collect())
}

/// Run the STFT and [`find_loop_candidates`] on a raw signal
///
/// # Errors
///
/// Propagates STFT errors (`InsufficientData` for a signal shorter than one
/// frame).
pub fn find_loop_candidates_from_signal(
    samples: &[f32],
    sample_rate: u32,
    stft_config: &StftConfig,
    config: &StructureConfig,
    parallel: bool,
) -> Result<Vec<LoopCandidate>, AnalysisError> {
    let spectrogram = stft(samples, sample_rate, stft_config, parallel)?;
    let magnitudes = spectrogram.magnitudes(parallel);
    find_loop_candidates(
        &magnitudes,
        sample_rate,
        spectrogram.fft_size,
        spectrogram.hop_length,
        config,
        parallel,
    )
}

/// Earliest frame whose one-loop window of similarity at `lag` reaches
/// `tolerance` × the best window
fn start_frame(features: &[Vec<f32>], lag: usize, tolerance: f32) -> usize {
    let n = features.len();
    if lag == 0 || 2 * lag > n {
        return 0;
    }
    let similarity: Vec<f32> = (0..n - lag)
        .map(|i| cosine_similarity(&features[i], &features[i + lag]))
        .collect();

    // Window sums over `lag` consecutive frames for starts 0..=n - 2·lag
    let mut windows = Vec::with_capacity(n - 2 * lag + 1);
    let mut sum: f32 = similarity[..lag].iter().sum();
    windows.push(sum);
    for i in 1..=(n - 2 * lag) {
        sum += similarity[i + lag - 1] - similarity[i - 1];
        windows.push(sum);
    }

    let best = windows.iter().copied().fold(0.0f32, f32::max);
    if best <= EPSILON {
        return 0;
    }
    windows
        .iter()
        .position(|&w| w >= tolerance * best)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::recurrence::RecurrenceMode;
    use super::*;

    fn tone(freq: f32, seconds: f32, sr: u32) -> Vec<f32> {
        let n = (seconds * sr as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    /// Four half-second notes repeated `repeats` times
    fn arpeggio(repeats: usize, sr: u32) -> Vec<f32> {
        let mut pattern = Vec::new();
        for f in [440.0, 523.25, 659.25, 392.0] {
            pattern.extend(tone(f, 0.5, sr));
        }
        pattern.repeat(repeats)
    }

    #[test]
    fn test_repeated_pattern_finds_pattern_length() {
        let sr = 22050;
        let samples = arpeggio(4, sr);
        let candidates = find_loop_candidates_from_signal(
            &samples,
            sr,
            &StftConfig::default(),
            &StructureConfig::default(),
            false,
        )
        .unwrap();

        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert!((best.length_seconds - 2.0).abs() < 0.05, "length {:.3}", best.length_seconds);
        assert!(best.start_sample < sr as usize / 10, "start {}", best.start_sample);
        assert_eq!(best.confidence, 1.0);
    }

    #[test]
    fn test_connectivity_mode_finds_pattern_length() {
        let sr = 22050;
        let samples = arpeggio(4, sr);
        let config = StructureConfig {
            mode: RecurrenceMode::Connectivity,
            ..StructureConfig::default()
        };
        let candidates =
            find_loop_candidates_from_signal(&samples, sr, &StftConfig::default(), &config, false).unwrap();

        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert!((best.length_seconds - 2.0).abs() < 0.05, "length {:.3}", best.length_seconds);
        assert_eq!(best.confidence, 1.0);
    }

    #[test]
    fn test_single_lag_window_is_searched() {
        let sr = 22050;
        let samples = arpeggio(4, sr);
        // The 2.0 s period is 86.13 frames; the window holds lag 86 only
        let frame_rate = sr as f32 / 512.0;
        let config = StructureConfig {
            min_loop_seconds: 85.5 / frame_rate,
            max_loop_seconds: 86.5 / frame_rate,
            ..StructureConfig::default()
        };
        let candidates =
            find_loop_candidates_from_signal(&samples, sr, &StftConfig::default(), &config, false).unwrap();

        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].length_seconds - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_silence_has_no_candidates() {
        let candidates = find_loop_candidates_from_signal(
            &vec![0.0; 22050 * 4],
            22050,
            &StftConfig::default(),
            &StructureConfig::default(),
            false,
        )
        .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_candidates_sorted_and_capped() {
        let sr = 22050;
        let samples = arpeggio(4, sr);
        let config = StructureConfig {
            top_k: 2,
            peak_threshold: 0.0,
            ..StructureConfig::default()
        };
        let candidates =
            find_loop_candidates_from_signal(&samples, sr, &StftConfig::default(), &config, false)
                .unwrap();
        assert!(candidates.len() <= 2);
        assert!(candidates.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_start_frame_prefers_earliest_strong_window() {
        let mut features = vec![vec![1.0f32, 0.0]; 40];
        // Frames 0..5 do not repeat
        for f in features.iter_mut().take(5) {
            *f = vec![0.0, 1.0];
        }
        assert_eq!(start_frame(&features, 10, 1.0), 5);
        assert_eq!(start_frame(&features, 10, 0.5), 0);
    }
}
