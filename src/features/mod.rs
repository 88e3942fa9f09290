//! Feature extraction modules
//!
//! This module contains all analysis stages:
//! - Spectral engine (window, FFT, STFT)
//! - Onset strength and onset picking
//! - Period estimation (tempo, local tempo curve)
//! - Beat tracking (dynamic programming)
//! - Chroma extraction
//! - Structure analysis (recurrence, lag energy, loop candidates)
//! - Loop refinement

pub mod beat_tracking;
pub mod chroma;
pub mod looping;
pub mod onset;
pub mod period;
pub mod spectral;
pub mod structure;
