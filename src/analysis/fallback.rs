//! Default loop when no candidate is accepted
//!
//! The loop starts at sample 0 and spans `bars` bars at the given tempo. The
//! bar count is halved until the loop fits the buffer; if even one bar does
//! not fit, the whole buffer is the loop. Confidence is always 0.

use super::result::LoopRegion;

/// Fallback loop and the number of bars it spans (0 for the whole buffer)
pub fn fallback_loop(
    n_samples: usize,
    sample_rate: u32,
    bpm: f32,
    beats_per_bar: usize,
    bars: usize,
) -> (LoopRegion, usize) {
    let whole = (LoopRegion::from_samples(0, n_samples, sample_rate, 0.0), 0);
    if !bpm.is_finite() || bpm <= 0.0 || sample_rate == 0 {
        return whole;
    }

    let bar_samples = beats_per_bar.max(1) as f64 * 60.0 / bpm as f64 * sample_rate as f64;
    let mut bars = bars.max(1);
    loop {
        let length = (bars as f64 * bar_samples).round() as usize;
        if length > 0 && length <= n_samples {
            log::debug!("Fallback loop: {} bars at {:.1} BPM ({} samples)", bars, bpm, length);
            return (LoopRegion::from_samples(0, length, sample_rate, 0.0), bars);
        }
        if bars == 1 {
            log::debug!("Fallback loop: one bar exceeds the buffer, using all {} samples", n_samples);
            return whole;
        }
        bars /= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_bars_fit() {
        // 4 bars of 4/4 at 120 BPM = 8 s
        let (region, bars) = fallback_loop(44100 * 10, 44100, 120.0, 4, 4);
        assert_eq!(bars, 4);
        assert_eq!(region.start_sample, 0);
        assert_eq!(region.end_sample, 44100 * 8);
        assert_eq!(region.confidence, 0.0);
    }

    #[test]
    fn test_halves_until_it_fits() {
        let (region, bars) = fallback_loop(44100 * 5, 44100, 120.0, 4, 4);
        assert_eq!(bars, 2);
        assert!((region.length_seconds() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_whole_buffer_when_one_bar_is_too_long() {
        let (region, bars) = fallback_loop(44100, 44100, 120.0, 4, 4);
        assert_eq!(bars, 0);
        assert_eq!(region.end_sample, 44100);
    }
}
