//! Analysis result types

use crate::features::period::TempoEstimate;
use crate::features::structure::LoopCandidate;
use serde::{Deserialize, Serialize};

pub use super::metadata::AnalysisMetadata;

/// Beat grid structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Beat positions as STFT frame indices (strictly increasing)
    pub frames: Vec<usize>,

    /// All beat times in seconds
    pub times: Vec<f32>,

    /// Downbeat times (every `beats_per_bar`-th beat) in seconds
    pub downbeats: Vec<f32>,

    /// Grid stability (0.0-1.0): 1 − coefficient of variation of the beat
    /// intervals, 0 with fewer than three beats
    pub stability: f32,
}

impl BeatGrid {
    /// Grid with no beats
    pub fn empty() -> Self {
        Self {
            frames: vec![],
            times: vec![],
            downbeats: vec![],
            stability: 0.0,
        }
    }
}

/// The chosen loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    /// Loop start in seconds
    pub start_seconds: f32,
    /// Loop end in seconds
    pub end_seconds: f32,
    /// First sample of the loop
    pub start_sample: usize,
    /// One past the last sample of the loop
    pub end_sample: usize,
    /// Confidence (0.0-1.0); 0 for a fallback loop
    pub confidence: f32,
}

impl LoopRegion {
    /// Region covering a refined candidate
    pub fn from_candidate(candidate: &LoopCandidate, sample_rate: u32) -> Self {
        Self::from_samples(
            candidate.start_sample,
            candidate.end_sample,
            sample_rate,
            candidate.confidence,
        )
    }

    pub(crate) fn from_samples(start: usize, end: usize, sample_rate: u32, confidence: f32) -> Self {
        let sr = sample_rate.max(1) as f32;
        Self {
            start_seconds: start as f32 / sr,
            end_seconds: end as f32 / sr,
            start_sample: start,
            end_sample: end,
            confidence,
        }
    }

    /// Loop length in seconds
    pub fn length_seconds(&self) -> f32 {
        self.end_seconds - self.start_seconds
    }

    /// Loop length in samples
    pub fn length_samples(&self) -> usize {
        self.end_sample - self.start_sample
    }
}

/// Analysis flags
///
/// Each flag names a stage that degraded to a default or a result that
/// deserves a second look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// No tempo peak in the search window; the default BPM was used
    TempoFallback,
    /// The onset envelope had no picked onsets
    NoOnsets,
    /// The beat tracker produced no beats
    NoBeats,
    /// Structure analysis found no repetition
    NoRepetition,
    /// No refined candidate reached the acceptance threshold
    LoopBelowThreshold,
    /// The fallback loop had fewer bars than configured
    FallbackLoopShortened,
    /// Low tempo confidence
    LowTempoConfidence,
    /// Unstable beat grid (tempo drift or ambiguous beats)
    UnstableBeatGrid,
    /// Low loop confidence
    LowLoopConfidence,
}

/// Complete analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Tempo estimate with ranked candidates
    pub tempo: TempoEstimate,

    /// Beat grid
    pub beats: BeatGrid,

    /// Chosen loop
    pub loop_region: LoopRegion,

    /// Refined loop candidates, best first
    pub candidates: Vec<LoopCandidate>,

    /// Any stage degraded to its documented default
    pub used_fallback: bool,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}
