//! Confidence scoring module
//!
//! Summarizes how far an analysis result can be trusted.
//!
//! # Confidence Components
//!
//! 1. **Tempo Confidence**: strength of the chosen autocorrelation peak
//! 2. **Grid Stability**: regularity of the tracked beat intervals
//! 3. **Loop Confidence**: refined confidence of the chosen loop (0 for a fallback loop)
//! 4. **Overall Confidence**: weighted combination of the three
//!
//! # Example
//!
//! ```no_run
//! use loopscope_dsp::{analyze, AnalysisConfig};
//! use loopscope_dsp::analysis::confidence::compute_confidence;
//!
//! let samples = vec![0.0f32; 44100 * 5];
//! let result = analyze(&samples, 44100, &AnalysisConfig::default())?;
//! let confidence = compute_confidence(&result);
//!
//! println!("Overall confidence: {:.2}", confidence.overall_confidence);
//! # Ok::<(), loopscope_dsp::AnalysisError>(())
//! ```

use super::result::{AnalysisFlag, AnalysisResult};
use serde::{Deserialize, Serialize};

const TEMPO_WEIGHT: f32 = 0.4;
const GRID_WEIGHT: f32 = 0.3;
const LOOP_WEIGHT: f32 = 0.3;

/// Analysis confidence scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfidence {
    /// Tempo confidence (0.0-1.0), 0 when the default tempo was used
    pub tempo_confidence: f32,

    /// Grid stability (0.0-1.0)
    pub grid_stability: f32,

    /// Loop confidence (0.0-1.0)
    pub loop_confidence: f32,

    /// Overall confidence
    ///
    /// - Tempo: 40% weight
    /// - Grid: 30% weight
    /// - Loop: 30% weight
    pub overall_confidence: f32,

    /// Result flags plus low-confidence flags
    pub flags: Vec<AnalysisFlag>,
}

/// Compute confidence scores for an analysis result
///
/// Flags already recorded in the metadata are carried over; tempo below 0.3,
/// grid stability below 0.3 and loop confidence below 0.5 add their
/// low-confidence flag.
pub fn compute_confidence(result: &AnalysisResult) -> AnalysisConfidence {
    log::debug!("Computing confidence scores for analysis result");

    let tempo_confidence = if result.tempo.used_fallback {
        0.0
    } else {
        result.tempo.confidence.clamp(0.0, 1.0)
    };
    let grid_stability = result.beats.stability.clamp(0.0, 1.0);
    let loop_confidence = result.loop_region.confidence.clamp(0.0, 1.0);

    let overall_confidence = (tempo_confidence * TEMPO_WEIGHT
        + grid_stability * GRID_WEIGHT
        + loop_confidence * LOOP_WEIGHT)
        .clamp(0.0, 1.0);

    let mut flags = result.metadata.flags.clone();
    let mut add = |flag: AnalysisFlag| {
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    };
    if tempo_confidence < 0.3 {
        add(AnalysisFlag::LowTempoConfidence);
    }
    if grid_stability < 0.3 {
        add(AnalysisFlag::UnstableBeatGrid);
    }
    if loop_confidence < 0.5 {
        add(AnalysisFlag::LowLoopConfidence);
    }

    log::debug!(
        "Confidence scores: tempo={:.3}, grid={:.3}, loop={:.3}, overall={:.3}",
        tempo_confidence,
        grid_stability,
        loop_confidence,
        overall_confidence
    );

    AnalysisConfidence {
        tempo_confidence,
        grid_stability,
        loop_confidence,
        overall_confidence,
        flags,
    }
}

impl AnalysisConfidence {
    /// Overall confidence is at least 0.7
    pub fn is_high_confidence(&self) -> bool {
        self.overall_confidence >= 0.7
    }

    /// Overall confidence is below 0.5
    pub fn is_low_confidence(&self) -> bool {
        self.overall_confidence < 0.5
    }

    /// "High", "Medium" or "Low"
    pub fn confidence_level(&self) -> &'static str {
        if self.is_high_confidence() {
            "High"
        } else if self.is_low_confidence() {
            "Low"
        } else {
            "Medium"
        }
    }
}
