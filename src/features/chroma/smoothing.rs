//! Temporal chroma smoothing and decimation

/// Smooth feature frames with a centered moving average
///
/// Windows are truncated at the edges. A window of 0 or 1 returns the
/// input unchanged.
pub fn smooth_chroma(frames: &[Vec<f32>], window_size: usize) -> Vec<Vec<f32>> {
    if window_size <= 1 || frames.is_empty() {
        return frames.to_vec();
    }
    log::debug!(
        "Smoothing {} chroma vectors with window size {}",
        frames.len(),
        window_size
    );

    let half = window_size / 2;
    let n = frames.len();
    let dim = frames[0].len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + window_size - half).min(n);
            let mut out = vec![0.0f32; dim];
            for frame in &frames[lo..hi] {
                for (o, v) in out.iter_mut().zip(frame.iter()) {
                    *o += v;
                }
            }
            let count = (hi - lo) as f32;
            out.iter_mut().for_each(|o| *o /= count);
            out
        })
        .collect()
}

/// Average groups of consecutive frames so at most `max_frames` remain
///
/// Returns the decimated frames and the group size (1 = untouched). The
/// last group may be shorter.
pub fn decimate(frames: &[Vec<f32>], max_frames: usize) -> (Vec<Vec<f32>>, usize) {
    if max_frames == 0 || frames.len() <= max_frames {
        return (frames.to_vec(), 1);
    }
    let factor = frames.len().div_ceil(max_frames);
    let decimated = frames
        .chunks(factor)
        .map(|group| {
            let mut out = vec![0.0f32; group[0].len()];
            for frame in group {
                for (o, v) in out.iter_mut().zip(frame.iter()) {
                    *o += v;
                }
            }
            let count = group.len() as f32;
            out.iter_mut().for_each(|o| *o /= count);
            out
        })
        .collect();

    log::debug!(
        "Decimated {} frames by {} to stay under {}",
        frames.len(),
        factor,
        max_frames
    );
    (decimated, factor)
}
