//! Peak detection utilities
//!
//! Local maxima with relative thresholds, minimum spacing, downhill-walk
//! prominence and parabolic sub-sample refinement. Shared by tempo
//! estimation (autocorrelation peaks) and structure analysis (lag-energy
//! peaks).

const EPSILON: f32 = 1e-10;

/// A detected peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Index of the local maximum
    pub index: usize,
    /// Value at the local maximum
    pub value: f32,
    /// Height above the higher of the two downhill minima
    pub prominence: f32,
}

/// Find local maxima inside `[lo, hi]`
///
/// A sample is a local maximum when it is strictly greater than its left
/// neighbour and at least its right neighbour, so a flat top is reported once
/// at its left edge. Indices without both neighbours are skipped.
pub fn local_maxima(signal: &[f32], lo: usize, hi: usize) -> Vec<usize> {
    if signal.len() < 3 {
        return vec![];
    }
    let lo = lo.max(1);
    let hi = hi.min(signal.len() - 2);
    if lo > hi {
        return vec![];
    }
    (lo..=hi)
        .filter(|&i| signal[i] > signal[i - 1] && signal[i] >= signal[i + 1])
        .collect()
}

/// Prominence of the peak at `index`
///
/// Walks downhill from the peak in each direction until the signal rises
/// again (or the edge is reached); the prominence is the peak value minus the
/// higher of the two minima.
pub fn prominence(signal: &[f32], index: usize) -> f32 {
    let peak = signal[index];

    let mut left = index;
    while left > 0 && signal[left - 1] <= signal[left] {
        left -= 1;
    }
    let mut right = index;
    while right + 1 < signal.len() && signal[right + 1] <= signal[right] {
        right += 1;
    }

    peak - signal[left].max(signal[right])
}

/// Local maxima in `[lo, hi]` whose prominence is at least `min_prominence`
///
/// Returned in index order.
pub fn find_prominent_peaks(signal: &[f32], lo: usize, hi: usize, min_prominence: f32) -> Vec<Peak> {
    local_maxima(signal, lo, hi)
        .into_iter()
        .map(|index| Peak {
            index,
            value: signal[index],
            prominence: prominence(signal, index),
        })
        .filter(|p| p.prominence >= min_prominence)
        .collect()
}

/// Find peaks above a relative threshold, at least `min_distance` apart
///
/// `threshold` is a fraction of the maximum value. When two peaks are closer
/// than `min_distance` the higher one is kept. Returned sorted by value
/// (highest first).
///
/// # Example
///
/// ```
/// use loopscope_dsp::features::period::peak_picking::find_peaks;
///
/// let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
/// let peaks = find_peaks(&signal, 0.5, 2);
/// assert_eq!(peaks[0].0, 2);
/// assert_eq!(peaks[1].0, 5);
/// ```
pub fn find_peaks(signal: &[f32], threshold: f32, min_distance: usize) -> Vec<(usize, f32)> {
    if signal.is_empty() {
        return vec![];
    }
    find_peaks_in_range(signal, 0, signal.len() - 1, threshold, min_distance)
}

/// [`find_peaks`] restricted to indices `[lo, hi]`
///
/// The threshold is relative to the maximum inside the range, so strong
/// values outside it do not mask peaks within.
pub fn find_peaks_in_range(
    signal: &[f32],
    lo: usize,
    hi: usize,
    threshold: f32,
    min_distance: usize,
) -> Vec<(usize, f32)> {
    if signal.len() < 3 || lo > hi || lo >= signal.len() {
        return vec![];
    }

    let hi = hi.min(signal.len() - 1);
    let max_value = signal[lo..=hi].iter().copied().fold(0.0f32, f32::max);
    if max_value < EPSILON {
        return vec![];
    }
    let actual_threshold = max_value * threshold;

    let mut peaks: Vec<(usize, f32)> = local_maxima(signal, lo, hi)
        .into_iter()
        .map(|i| (i, signal[i]))
        .filter(|&(_, v)| v >= actual_threshold)
        .collect();

    // Highest first, ties to the earlier index
    peaks.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    if min_distance > 1 {
        let mut kept: Vec<(usize, f32)> = Vec::with_capacity(peaks.len());
        for (idx, value) in peaks {
            if kept.iter().all(|&(k, _)| idx.abs_diff(k) >= min_distance) {
                kept.push((idx, value));
            }
        }
        peaks = kept;
    }

    log::debug!(
        "Found {} peaks in [{}, {}] (threshold {:.3}, min_distance {})",
        peaks.len(),
        lo,
        hi,
        actual_threshold,
        min_distance
    );

    peaks
}

/// Sub-sample offset of a parabola through three equally spaced points
///
/// Returns a value in [-0.5, 0.5] to add to the index of `center`; 0 when the
/// points are collinear.
pub fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denom = left - 2.0 * center + right;
    if denom.abs() < EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}

/// Refined position of the peak at `index` (falls back to `index` at the edges)
pub fn refine_peak(signal: &[f32], index: usize) -> f32 {
    if index == 0 || index + 1 >= signal.len() {
        return index as f32;
    }
    index as f32 + parabolic_offset(signal[index - 1], signal[index], signal[index + 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_peaks_basic() {
        let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
        let peaks = find_peaks(&signal, 0.5, 2);
        assert_eq!(peaks, vec![(2, 1.0), (5, 0.9)]);
    }

    #[test]
    fn test_find_peaks_empty_and_flat() {
        assert!(find_peaks(&[], 0.5, 2).is_empty());
        assert!(find_peaks(&[0.0; 10], 0.1, 1).is_empty());
    }

    #[test]
    fn test_find_peaks_min_distance_keeps_higher() {
        let signal = vec![0.0, 1.0, 0.5, 0.8, 0.0, 0.0];
        let peaks = find_peaks(&signal, 0.1, 3);
        assert_eq!(peaks, vec![(1, 1.0)]);
    }

    #[test]
    fn test_find_peaks_threshold() {
        let signal = vec![0.0, 1.0, 0.0, 0.05, 0.0];
        let peaks = find_peaks(&signal, 0.1, 1);
        assert_eq!(peaks.len(), 1);
    }

    #[test]
    fn test_find_peaks_in_range_ignores_outside_values() {
        let signal = vec![0.0, 10.0, 0.0, 0.0, 1.0, 0.0, 0.8, 0.0];
        let peaks = find_peaks_in_range(&signal, 3, 7, 0.5, 1);
        assert_eq!(peaks, vec![(4, 1.0), (6, 0.8)]);
    }

    #[test]
    fn test_prominence_walks_downhill() {
        // Peak at 3 sits between minima 0.2 (left) and 0.4 (right)
        let signal = vec![0.5, 0.2, 0.6, 1.0, 0.4, 0.9, 0.1];
        assert!((prominence(&signal, 3) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_find_prominent_peaks_filters_ripples() {
        let signal = vec![0.0, 1.0, 0.0, 0.5, 0.48, 0.49, 0.0];
        let peaks = find_prominent_peaks(&signal, 0, 6, 0.1);
        let idx: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(idx, vec![1]);
        assert!((peaks[0].prominence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_parabolic_offset_symmetric_peak() {
        assert_eq!(parabolic_offset(0.5, 1.0, 0.5), 0.0);
        assert!(parabolic_offset(0.5, 1.0, 0.9) > 0.0);
        assert!(parabolic_offset(0.9, 1.0, 0.5) < 0.0);
        assert_eq!(parabolic_offset(1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_refine_peak_exact_parabola() {
        // y = -(x - 2.25)^2 sampled at 1, 2, 3
        let f = |x: f32| -(x - 2.25) * (x - 2.25);
        let signal = vec![f(0.0), f(1.0), f(2.0), f(3.0), f(4.0)];
        assert!((refine_peak(&signal, 2) - 2.25).abs() < 1e-5);
    }
}
