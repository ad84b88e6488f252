//! FFT wrapper and window helpers for the correlation kernels.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use std::sync::Arc;

/// Double-precision FFT processor with cached plans.
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f64>>,
    ifft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl Fft {
    /// Create plans for the given transform size.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        Self { fft, ifft, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform, in place, unnormalized.
    pub fn forward(&self, buffer: &mut [Complex<f64>]) {
        debug_assert_eq!(buffer.len(), self.size);
        self.fft.process(buffer);
    }

    /// Inverse transform, in place, normalized by `1/N` so that
    /// `inverse(forward(x)) == x`.
    pub fn inverse(&self, buffer: &mut [Complex<f64>]) {
        debug_assert_eq!(buffer.len(), self.size);
        self.ifft.process(buffer);
        let scale = 1.0 / self.size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

/// Smallest power of two that is `>= n` (and at least 1).
pub fn next_pow2(n: usize) -> usize {
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

/// Symmetric Hann window coefficients.
pub fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let fft = Fft::new(256);
        let original: Vec<Complex<f64>> = (0..256)
            .map(|i| Complex::new((i as f64 * 0.1).sin(), 0.0))
            .collect();

        let mut buffer = original.clone();
        fft.forward(&mut buffer);
        fft.inverse(&mut buffer);

        for (a, b) in original.iter().zip(buffer.iter()) {
            assert!((a.re - b.re).abs() < 1e-9);
            assert!(b.im.abs() < 1e-9);
        }
    }

    #[test]
    fn test_next_pow2() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(2), 2);
        assert_eq!(next_pow2(3), 4);
        assert_eq!(next_pow2(1025), 2048);
    }

    #[test]
    fn test_hann_edges() {
        let w = hann_window(101);
        assert!(w[0].abs() < 1e-12);
        assert!(w[100].abs() < 1e-12);
        assert!((w[50] - 1.0).abs() < 1e-12);
    }
}
