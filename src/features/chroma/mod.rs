//! Chroma extraction
//!
//! Pitch-class distribution (12 semitones) per STFT frame, used as the
//! feature for structural repetition:
//! - Chroma vector computation
//! - Normalization
//! - Temporal smoothing and decimation

pub mod extractor;
pub mod normalization;
pub mod smoothing;

pub use extractor::{extract_chroma, N_CHROMA};
