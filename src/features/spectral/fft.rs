//! Recursive radix-2 Cooley–Tukey FFT
//!
//! Inputs whose length is not a power of two are zero-padded to the next
//! power of two; the caller's slice is never modified. The twiddle table is
//! computed once per transform size in double precision, so a plan can be
//! shared across every frame of an STFT.
//!
//! # Example
//!
//! ```
//! use loopscope_dsp::features::spectral::fft::{fft, ifft};
//! use rustfft::num_complex::Complex;
//!
//! let signal: Vec<Complex<f32>> = (0..8).map(|i| Complex::new(i as f32, 0.0)).collect();
//! let spectrum = fft(&signal);
//! let restored = ifft(&spectrum);
//! assert!((restored[3].re - 3.0).abs() < 1e-5);
//! ```

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// Zero-valued complex number
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Precomputed radix-2 transform of a fixed power-of-two size
#[derive(Debug, Clone)]
pub struct Radix2Fft {
    size: usize,
    /// exp(-2πik/size) for k in 0..size/2
    twiddles: Vec<Complex<f32>>,
}

impl Radix2Fft {
    /// Plan a transform for `len` points, rounded up to the next power of two
    pub fn new(len: usize) -> Self {
        let size = len.max(1).next_power_of_two();
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f64 / size as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();
        Self { size, twiddles }
    }

    /// Transform size (always a power of two)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform; `input` is zero-padded or truncated to `size()`
    pub fn forward(&self, input: &[Complex<f32>]) -> Vec<Complex<f32>> {
        self.run(input, false)
    }

    /// Inverse transform scaled by 1/size
    pub fn inverse(&self, input: &[Complex<f32>]) -> Vec<Complex<f32>> {
        let scale = 1.0 / self.size as f32;
        let mut out = self.run(input, true);
        for x in &mut out {
            *x *= scale;
        }
        out
    }

    /// Forward transform of a real signal
    pub fn forward_real(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let padded: Vec<Complex<f32>> = input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.run(&padded, false)
    }

    fn run(&self, input: &[Complex<f32>], inverse: bool) -> Vec<Complex<f32>> {
        let mut padded = vec![COMPLEX_ZERO; self.size];
        let n = input.len().min(self.size);
        padded[..n].copy_from_slice(&input[..n]);

        let mut output = vec![COMPLEX_ZERO; self.size];
        self.recurse(&padded, 0, 1, &mut output, inverse);
        output
    }

    /// Decimation in time: `output` receives the DFT of the `output.len()`
    /// samples of `input` starting at `offset` with the given `stride`.
    fn recurse(
        &self,
        input: &[Complex<f32>],
        offset: usize,
        stride: usize,
        output: &mut [Complex<f32>],
        inverse: bool,
    ) {
        let m = output.len();
        if m == 1 {
            output[0] = input[offset];
            return;
        }

        let half = m / 2;
        {
            let (even, odd) = output.split_at_mut(half);
            self.recurse(input, offset, stride * 2, even, inverse);
            self.recurse(input, offset + stride, stride * 2, odd, inverse);
        }

        // m = size / stride, so exp(-2πik/m) = twiddles[k * stride]
        for k in 0..half {
            let tw = self.twiddles[k * stride];
            let tw = if inverse { tw.conj() } else { tw };
            let e = output[k];
            let o = tw * output[k + half];
            output[k] = e + o;
            output[k + half] = e - o;
        }
    }
}

/// Forward FFT, zero-padding to the next power of two
pub fn fft(input: &[Complex<f32>]) -> Vec<Complex<f32>> {
    Radix2Fft::new(input.len()).forward(input)
}

/// Inverse FFT (scaled by 1/N), zero-padding to the next power of two
pub fn ifft(input: &[Complex<f32>]) -> Vec<Complex<f32>> {
    Radix2Fft::new(input.len()).inverse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    /// Deterministic pseudo-random signal (LCG)
    fn test_signal(len: usize, seed: u64) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_random_real_signals() {
        for (len, seed) in [(8, 1), (256, 2), (1024, 3), (4096, 4)] {
            let x = test_signal(len, seed);
            let input: Vec<Complex<f32>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
            let restored = ifft(&fft(&input));

            let err: f32 = x
                .iter()
                .zip(restored.iter())
                .map(|(a, b)| (a - b.re).powi(2) + b.im.powi(2))
                .sum::<f32>()
                .sqrt();
            let norm: f32 = x.iter().map(|a| a * a).sum::<f32>().sqrt();
            assert!(err / norm < 1e-5, "len {}: relative error {}", len, err / norm);
        }
    }

    #[test]
    fn test_matches_rustfft() {
        let x = test_signal(512, 7);
        let ours = Radix2Fft::new(512).forward_real(&x);

        let mut reference: Vec<Complex<f32>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(512).process(&mut reference);

        let scale = reference.iter().map(|c| c.norm()).fold(0.0f32, f32::max);
        for (a, b) in ours.iter().zip(reference.iter()) {
            assert!((a - b).norm() / scale < 1e-5);
        }
    }

    #[test]
    fn test_non_power_of_two_zero_pads() {
        let input: Vec<Complex<f32>> = (0..5).map(|i| Complex::new(i as f32, 0.0)).collect();
        let spectrum = fft(&input);
        assert_eq!(spectrum.len(), 8);
        // DC bin is the plain sum
        assert!((spectrum[0].re - 10.0).abs() < 1e-5);
        // input untouched
        assert_eq!(input.len(), 5);
    }

    #[test]
    fn test_impulse_is_flat() {
        let mut input = vec![COMPLEX_ZERO; 16];
        input[0] = Complex::new(1.0, 0.0);
        for bin in fft(&input) {
            assert!((bin.re - 1.0).abs() < 1e-6);
            assert!(bin.im.abs() < 1e-6);
        }
    }

    #[test]
    fn test_silence_is_zero_not_nan() {
        let spectrum = Radix2Fft::new(64).forward_real(&[0.0; 64]);
        assert!(spectrum.iter().all(|c| c.re == 0.0 && c.im == 0.0));
    }

    #[test]
    fn test_sine_peak_bin() {
        let n = 1024;
        let x: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 32.0 * i as f32 / n as f32).sin())
            .collect();
        let spectrum = Radix2Fft::new(n).forward_real(&x);
        let peak = spectrum[..n / 2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 32);
    }
}
