//! Beat grid helpers
//!
//! Downbeats are every `beats_per_bar`-th beat starting from the first
//! tracked beat. Grid stability is `1 - CV` of the inter-beat intervals,
//! clamped to [0, 1].

/// Downbeat times taken every `beats_per_bar` beats
pub fn downbeats(beat_times: &[f32], beats_per_bar: usize) -> Vec<f32> {
    if beats_per_bar == 0 {
        return vec![];
    }
    beat_times.iter().step_by(beats_per_bar).copied().collect()
}

/// Regularity of the beat grid (1.0 = perfectly even spacing)
///
/// Fewer than three beats give 0.
pub fn grid_stability(beat_times: &[f32]) -> f32 {
    if beat_times.len() < 3 {
        return 0.0;
    }
    let intervals: Vec<f32> = beat_times.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = intervals.iter().sum::<f32>() / intervals.len() as f32;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = intervals.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / intervals.len() as f32;
    (1.0 - var.sqrt() / mean).clamp(0.0, 1.0)
}
