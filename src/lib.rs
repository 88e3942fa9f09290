//! # Loopscope DSP
//!
//! The audio-analysis core of a loop-finding toolkit: turns a mono PCM
//! buffer into a tempo estimate, a beat grid and ranked, sample-accurate
//! loop regions.
//!
//! ## Features
//!
//! - **Spectral engine**: radix-2 FFT and windowed STFT
//! - **Onset detection**: spectral-flux envelope and adaptive-threshold onset picking
//! - **Tempo**: normalized autocorrelation with a common-tempo prior and octave correction
//! - **Beat tracking**: dynamic-programming beat path with static or per-frame tempo
//! - **Loop detection**: chroma recurrence matrix and lag energy, refined to
//!   zero crossings and rescored by waveform correlation
//!
//! ## Quick Start
//!
//! ```no_run
//! use loopscope_dsp::{analyze, AnalysisConfig};
//!
//! // Load audio samples (mono, f32, normalized)
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let result = analyze(&samples, sample_rate, &AnalysisConfig::default())?;
//!
//! println!("BPM: {:.2} (confidence: {:.2})", result.tempo.bpm, result.tempo.confidence);
//! println!(
//!     "Loop: {:.3}s - {:.3}s",
//!     result.loop_region.start_seconds, result.loop_region.end_seconds
//! );
//! # Ok::<(), loopscope_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Signal → STFT → Onset envelope → Tempo → Beat tracking
//!               ↘ Chroma → Recurrence → Lag energy → Loop candidates → Refinement
//! ```
//!
//! Every stage that cannot produce a confident result degrades to a
//! documented default and records an [`AnalysisFlag`]; only malformed input
//! is an error.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
#[cfg(feature = "cache")]
pub mod cache;
pub mod config;
pub mod error;
pub mod features;
mod parallel;
pub mod preprocessing;

// Re-export main types
pub use analysis::result::{AnalysisFlag, AnalysisMetadata, AnalysisResult, BeatGrid, LoopRegion};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::period::TempoEstimate;
pub use features::structure::LoopCandidate;
pub use preprocessing::Signal;

use analysis::fallback::fallback_loop;
use features::beat_tracking::grid::{downbeats, grid_stability};
use features::beat_tracking::{track_beats, TempoInput};
use features::looping::{rank_candidates, refine_all, RefineContext};
use features::onset::spectral_flux::spectral_flux;
use features::onset::{pick_onsets, OnsetEnvelope};
use features::period::{estimate_tempo, estimate_tempo_curve};
use features::spectral::stft;
use features::structure::find_loop_candidates;

/// Main analysis function
///
/// Analyzes a mono buffer and returns the tempo, beat grid, ranked loop
/// candidates and the chosen loop.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `AnalysisResult`. When no candidate reaches
/// `config.fallback.acceptance_threshold` the loop is the fallback loop
/// (zero confidence) and `used_fallback` is set.
///
/// # Errors
///
/// - `AnalysisError::InvalidInput` for an empty buffer, a zero sample rate,
///   a buffer with no finite sample, or an invalid configuration
/// - `AnalysisError::InsufficientData` for a buffer shorter than one frame
///
/// # Example
///
/// ```no_run
/// use loopscope_dsp::{analyze, AnalysisConfig};
///
/// let samples = vec![0.0f32; 44100 * 5]; // 5 seconds of silence
/// let result = analyze(&samples, 44100, &AnalysisConfig::default())?;
/// assert!(result.used_fallback);
/// # Ok::<(), loopscope_dsp::AnalysisError>(())
/// ```
pub fn analyze(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!("Starting audio analysis: {} samples at {} Hz", samples.len(), sample_rate);

    config.validate()?;
    let signal = Signal::new(samples, sample_rate)?;
    let parallel = config.parallel;
    let hop_length = config.stft.hop_length;
    let mut metadata = AnalysisMetadata::new(signal.len(), sample_rate);
    let mut used_fallback = false;

    // 1. Spectral representation
    let spectrogram = stft(signal.samples(), sample_rate, &config.stft, parallel)?;
    let magnitudes = spectrogram.magnitudes(parallel);
    metadata.n_frames = spectrogram.n_frames();

    // 2. Onset envelope
    let envelope = OnsetEnvelope {
        values: spectral_flux(&magnitudes)?,
        sample_rate,
        hop_length,
    };

    // 3. Tempo
    let tempo = estimate_tempo(&envelope.values, sample_rate, hop_length, &config.tempo)?;
    if tempo.used_fallback {
        used_fallback = true;
        metadata.warn(
            AnalysisFlag::TempoFallback,
            format!("No tempo peak found, using default {:.1} BPM", tempo.bpm),
        );
    }

    // 4. Beat tracking
    let tempo_input = if config.tempo.dynamic && !tempo.used_fallback {
        TempoInput::Curve(estimate_tempo_curve(
            &envelope.values,
            sample_rate,
            hop_length,
            tempo.bpm,
            &config.tempo,
        ))
    } else {
        TempoInput::Static(tempo.bpm)
    };
    let beats = track_beats(&envelope.values, &tempo_input, envelope.frame_rate(), &config.beat)?;
    let times = beats.times(hop_length, sample_rate);
    if times.is_empty() {
        metadata.flag(AnalysisFlag::NoBeats);
    }
    let beat_grid = BeatGrid {
        downbeats: downbeats(&times, config.beat.beats_per_bar),
        stability: grid_stability(&times),
        frames: beats.frames,
        times,
    };

    // 5. Onsets for boundary alignment
    let onsets = pick_onsets(&envelope.values, config.refine.onset_threshold_k);
    metadata.n_onsets = onsets.len();
    if onsets.is_empty() {
        used_fallback = true;
        metadata.warn(AnalysisFlag::NoOnsets, "No onsets detected");
    }
    let onset_samples: Vec<usize> = onsets.iter().map(|&f| f * hop_length).collect();

    // 6. Structural loop candidates
    let structural = find_loop_candidates(
        &magnitudes,
        sample_rate,
        spectrogram.fft_size,
        hop_length,
        &config.structure,
        parallel,
    )?;
    if structural.is_empty() {
        used_fallback = true;
        metadata.warn(AnalysisFlag::NoRepetition, "No repetition found in the signal");
    }

    // 7. Sample-accurate refinement and ranking
    let context = RefineContext {
        tempo_bpm: if tempo.used_fallback { 0.0 } else { tempo.bpm },
        beats_per_bar: config.beat.beats_per_bar,
        onset_samples: &onset_samples,
        hop_length,
    };
    let mut candidates = refine_all(
        signal.samples(),
        sample_rate,
        &structural,
        &context,
        &config.refine,
        parallel,
    );
    rank_candidates(&mut candidates);

    // 8. Chosen loop or fallback
    let threshold = config.fallback.acceptance_threshold;
    let loop_region = match candidates.first() {
        Some(best) if best.confidence >= threshold => LoopRegion::from_candidate(best, sample_rate),
        best => {
            if let Some(best) = best {
                metadata.warn(
                    AnalysisFlag::LoopBelowThreshold,
                    format!(
                        "Best loop confidence {:.2} is below the acceptance threshold {:.2}",
                        best.confidence, threshold
                    ),
                );
            }
            used_fallback = true;
            let (region, bars) = fallback_loop(
                signal.len(),
                sample_rate,
                tempo.bpm,
                config.beat.beats_per_bar,
                config.fallback.loop_bars,
            );
            if bars < config.fallback.loop_bars {
                metadata.flag(AnalysisFlag::FallbackLoopShortened);
            }
            region
        }
    };

    log::debug!(
        "Analysis complete in {:.1} ms: {:.2} BPM, {} beats, loop {:.3}s-{:.3}s (confidence {:.2}), fallback={}",
        start_time.elapsed().as_secs_f32() * 1000.0,
        tempo.bpm,
        beat_grid.frames.len(),
        loop_region.start_seconds,
        loop_region.end_seconds,
        loop_region.confidence,
        used_fallback
    );

    Ok(AnalysisResult {
        tempo,
        beats: beat_grid,
        loop_region,
        candidates,
        used_fallback,
        metadata,
    })
}
