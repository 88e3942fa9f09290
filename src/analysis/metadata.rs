//! Analysis metadata structures

use super::result::AnalysisFlag;
use serde::{Deserialize, Serialize};

/// Analysis metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of STFT frames analysed
    pub n_frames: usize,

    /// Number of onsets picked from the envelope
    pub n_onsets: usize,

    /// Algorithm version
    pub algorithm_version: String,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,

    /// Confidence warnings (low confidence, ambiguous results, etc.)
    pub confidence_warnings: Vec<String>,
}

impl AnalysisMetadata {
    /// Empty metadata for a signal of `n_samples` at `sample_rate`
    pub fn new(n_samples: usize, sample_rate: u32) -> Self {
        Self {
            duration_seconds: n_samples as f32 / sample_rate.max(1) as f32,
            sample_rate,
            n_frames: 0,
            n_onsets: 0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            flags: vec![],
            confidence_warnings: vec![],
        }
    }

    /// Record a flag once
    pub fn flag(&mut self, flag: AnalysisFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    /// Record a flag together with a warning message
    pub fn warn(&mut self, flag: AnalysisFlag, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.flag(flag);
        self.confidence_warnings.push(message);
    }
}
