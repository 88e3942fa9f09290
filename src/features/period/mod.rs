//! Tempo estimation
//!
//! Onset envelope → normalized autocorrelation (tempogram) → prominent
//! peaks → common-tempo prior → octave correction → BPM. A windowed variant
//! produces a per-frame tempo curve for the beat tracker.

pub mod autocorrelation;
pub mod peak_picking;
pub mod tempo;
pub mod tempo_curve;

pub use tempo::estimate_tempo;
pub use tempo_curve::estimate_tempo_curve;

use serde::{Deserialize, Serialize};

/// Tempo candidate from the autocorrelation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoCandidate {
    /// BPM estimate
    pub bpm: f32,

    /// Normalized autocorrelation at the candidate lag (0.0-1.0)
    pub strength: f32,
}

/// Global tempo estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Tempo in BPM, always within the configured range
    pub bpm: f32,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Prominent candidates, best first (after the prior, before octave correction)
    pub candidates: Vec<TempoCandidate>,

    /// No prominent peak was found, or the envelope carried no periodicity
    pub used_fallback: bool,
}

impl TempoEstimate {
    /// Default tempo with zero confidence
    pub fn fallback(bpm: f32) -> Self {
        Self {
            bpm,
            confidence: 0.0,
            candidates: vec![],
            used_fallback: true,
        }
    }
}
