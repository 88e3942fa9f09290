//! Adaptive thresholding and onset peak picking
//!
//! Uses median + MAD (Median Absolute Deviation) as recommended by
//! McFee & Ellis (2014), which stays robust when a few strong transients
//! dominate the envelope.

use crate::error::AnalysisError;

/// Median of a slice (mean of the two middle values for even lengths)
pub(crate) fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

/// Compute `median(values) + k * MAD(values)`
///
/// # Reference
///
/// McFee, B., & Ellis, D. P. W. (2014). Better Beat Tracking Through Robust Onset Aggregation.
/// *Proceedings of the International Society for Music Information Retrieval Conference*.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `values` is empty or `k` is negative.
pub fn adaptive_threshold_median_mad(values: &[f32], k: f32) -> Result<f32, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty values for threshold calculation".to_string(),
        ));
    }
    if k < 0.0 {
        return Err(AnalysisError::InvalidInput(
            "MAD multiplier k must be non-negative".to_string(),
        ));
    }

    let med = median(values);
    let deviations: Vec<f32> = values.iter().map(|&v| (v - med).abs()).collect();
    let mad = median(&deviations);

    Ok(med + k * mad)
}

/// Pick onset frames from an onset-strength envelope
///
/// A frame is an onset when it is a local maximum (strictly above its left
/// neighbour, at least its right neighbour), strictly positive, and above the
/// median + `k`·MAD threshold of the whole envelope.
///
/// Returns frame indices in increasing order; an empty or silent envelope
/// yields no onsets.
pub fn pick_onsets(envelope: &[f32], k: f32) -> Vec<usize> {
    let threshold = match adaptive_threshold_median_mad(envelope, k.max(0.0)) {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };

    let n = envelope.len();
    let onsets: Vec<usize> = (0..n)
        .filter(|&i| {
            let v = envelope[i];
            let left = if i > 0 { envelope[i - 1] } else { f32::NEG_INFINITY };
            let right = if i + 1 < n { envelope[i + 1] } else { f32::NEG_INFINITY };
            v > 0.0 && v > threshold && v > left && v >= right
        })
        .collect();

    log::debug!(
        "Picked {} onsets (threshold {:.4}, k={:.1})",
        onsets.len(),
        threshold,
        k
    );
    onsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_threshold_median_mad_basic() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0]; // Outlier at 100
        let threshold = adaptive_threshold_median_mad(&values, 2.5).unwrap();

        // Median 3.5, MAD 1.5: the outlier barely moves the threshold
        assert!((threshold - 7.25).abs() < 1e-5);
    }

    #[test]
    fn test_adaptive_threshold_median_mad_empty() {
        assert!(adaptive_threshold_median_mad(&[], 2.5).is_err());
    }

    #[test]
    fn test_adaptive_threshold_negative_k() {
        assert!(adaptive_threshold_median_mad(&[1.0, 2.0], -1.0).is_err());
    }

    #[test]
    fn test_adaptive_threshold_single_value() {
        let threshold = adaptive_threshold_median_mad(&[5.0], 2.5).unwrap();
        assert_eq!(threshold, 5.0);
    }

    #[test]
    fn test_pick_onsets_finds_isolated_peaks() {
        let mut env = vec![0.1f32; 100];
        env[10] = 5.0;
        env[40] = 4.0;
        env[41] = 3.0;
        env[75] = 6.0;
        assert_eq!(pick_onsets(&env, 3.0), vec![10, 40, 75]);
    }

    #[test]
    fn test_pick_onsets_silence() {
        assert!(pick_onsets(&[0.0; 64], 1.5).is_empty());
        assert!(pick_onsets(&[], 1.5).is_empty());
    }

    #[test]
    fn test_pick_onsets_plateau_reported_once() {
        let mut env = vec![0.0f32; 20];
        env[5] = 2.0;
        env[6] = 2.0;
        assert_eq!(pick_onsets(&env, 1.0), vec![5]);
    }
}
