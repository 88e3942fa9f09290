//! Error types for the loop analysis engine

use std::fmt;

/// Errors that can occur during audio analysis
///
/// Only malformed input is surfaced here. Stage-local failures (no onsets,
/// no tempo peak, no recurrence peak) are recovered inside the pipeline and
/// reported through [`crate::AnalysisResult::used_fallback`]. Numerical
/// degeneracy (silence, zero variance) is guarded where it occurs and never
/// becomes an error.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters (empty buffer, zero sample rate, bad configuration)
    InvalidInput(String),

    /// Buffer shorter than one analysis frame
    InsufficientData {
        /// Number of samples provided
        provided: usize,
        /// Minimum number of samples required (one `frame_length`)
        minimum: usize,
    },

    /// Processing error during analysis
    ProcessingError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::InsufficientData { provided, minimum } => write!(
                f,
                "Insufficient data: {} samples provided, at least {} required",
                provided, minimum
            ),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
