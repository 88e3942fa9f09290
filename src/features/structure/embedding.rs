//! Time-delay embedding of feature frames
//!
//! Frame `t` of the output is the concatenation of input frames
//! `t, t - delay, ..., t - (steps - 1)·delay`, with zeros before the start
//! of the signal. The embedded features describe short trajectories instead
//! of single frames, which separates repeated passages from sustained notes.

/// Stack `steps` delayed copies of every frame
///
/// `steps == 1` (or `delay == 0`) returns the input unchanged.
pub fn stack_memory(frames: &[Vec<f32>], steps: usize, delay: usize) -> Vec<Vec<f32>> {
    if steps <= 1 || delay == 0 || frames.is_empty() {
        return frames.to_vec();
    }
    let dim = frames[0].len();
    log::debug!(
        "Time-delay embedding: {} frames, {} steps x {} frames delay",
        frames.len(),
        steps,
        delay
    );

    (0..frames.len())
        .map(|t| {
            let mut out = Vec::with_capacity(dim * steps);
            for m in 0..steps {
                match t.checked_sub(m * delay) {
                    Some(src) => out.extend_from_slice(&frames[src]),
                    None => out.extend(std::iter::repeat_n(0.0, dim)),
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_memory_layout() {
        let frames: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32, -(i as f32)]).collect();
        let stacked = stack_memory(&frames, 3, 2);
        assert_eq!(stacked.len(), 5);
        assert_eq!(stacked[4], vec![4.0, -4.0, 2.0, -2.0, 0.0, -0.0]);
        // Zero padding before the signal start
        assert_eq!(stacked[1], vec![1.0, -1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_single_step_is_identity() {
        let frames = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(stack_memory(&frames, 1, 3), frames);
    }
}
