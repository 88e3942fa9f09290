//! Input preparation
//!
//! - Validated, sanitized mono signal
//! - Channel mixing (interleaved multichannel to mono)

pub mod channel_mixer;
pub mod signal;

pub use signal::Signal;
