//! Analysis window functions
//!
//! Symmetric Hann, Hamming and Blackman windows plus a rectangular window
//! for callers that window upstream.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowType {
    /// Hann (raised cosine)
    Hann,
    /// Hamming
    Hamming,
    /// 3-term Blackman
    Blackman,
    /// No tapering
    Rectangular,
}

/// Generate a window of the given type and length
pub fn generate_window(window_type: WindowType, size: usize) -> Vec<f32> {
    match size {
        0 => return vec![],
        1 => return vec![1.0],
        _ => {}
    }

    let denom = (size - 1) as f64;
    (0..size)
        .map(|i| {
            let x = 2.0 * PI * i as f64 / denom;
            let w = match window_type {
                WindowType::Hann => 0.5 - 0.5 * x.cos(),
                WindowType::Hamming => 0.54 - 0.46 * x.cos(),
                WindowType::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                WindowType::Rectangular => 1.0,
            };
            w as f32
        })
        .collect()
}
