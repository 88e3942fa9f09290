//! Loop refinement
//!
//! Turns frame-resolution structural candidates into sample-accurate loops
//! on rising zero crossings and rescores them against the waveform.

pub mod refine;

pub use refine::{rank_candidates, refine, refine_all, RefineContext};
