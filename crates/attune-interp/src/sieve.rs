//! Bidirectional spectral-sieve gap filling.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Maximum number of samples used for FFT analysis on each side of the gap.
/// 1024 balances frequency resolution against synthesis cost.
pub const MAX_WINDOW_SIZE: usize = 1024;

/// Minimum samples required on each side of the gap for a meaningful
/// spectral analysis.
pub const MIN_CONTEXT_SAMPLES: usize = 4;

/// How far a spectral peak must stand above the average magnitude to pass
/// the sieve. 2.5 filters out room noise and low-level artifacts.
const SIEVE_SENSITIVITY: f64 = 2.5;

/// Scales two-sided forward-FFT magnitudes back to real-world amplitudes
/// for synthesis.
const SPECTRUM_NORMALIZATION: f64 = 2.0;

/// Fill an audio gap of `gap_len` samples between `before` and `after`.
///
/// Both context slices are in time order: `before` ends at the sample just
/// ahead of the gap, `after` starts at the sample just past it. Returns
/// exactly `gap_len` synthesized samples (zeros when either context is
/// shorter than [`MIN_CONTEXT_SAMPLES`]).
///
/// # Method
///
/// 1. **Windowing** — takes the largest power-of-two window (capped at
///    [`MAX_WINDOW_SIZE`]) that fits both contexts: the tail of `before`
///    and the head of `after`.
/// 2. **Spectral sieve** — forward-FFTs each window and keeps only the
///    bins that are local magnitude maxima above a dynamic threshold of
///    2.5× the average. This isolates tonal components from stochastic
///    noise so the extension does not smear hiss into the gap.
/// 3. **Projection** — extends each side into the gap by summing cosines
///    that continue the surviving peaks' frequency, amplitude, and phase:
///    forward from the past, backward from the future.
/// 4. **Cubic cross-fade** — blends the two projections with
///    `w(t) = 3t² − 2t³`, which matches first derivatives at the blend
///    midpoint.
/// 5. **Trend correction** — subtracts the linearly faded boundary offsets
///    so the fill meets both neighbors with zero discontinuity.
pub fn interpolate(before: &[f64], after: &[f64], gap_len: usize) -> Vec<f64> {
    if before.len() < MIN_CONTEXT_SAMPLES || after.len() < MIN_CONTEXT_SAMPLES {
        return vec![0.0; gap_len];
    }

    let n = largest_power_of_two(before.len().min(after.len()).min(MAX_WINDOW_SIZE));
    let window_before = &before[before.len() - n..];
    let window_after = &after[..n];

    let forward = extend_spectral_sieve(window_before, gap_len, true);
    let backward = extend_spectral_sieve(window_after, gap_len, false);

    let v_start = window_before[n - 1];
    let v_end = window_after[0];

    let mut result = vec![0.0; gap_len];
    for (i, out) in result.iter_mut().enumerate() {
        let t = (i + 1) as f64 / (gap_len + 1) as f64;
        let w = t * t * (3.0 - 2.0 * t);

        let mut val = (1.0 - w) * forward[i] + w * backward[i];

        let start_diff = forward[0] - v_start;
        let end_diff = backward[gap_len - 1] - v_end;
        val -= (1.0 - w) * start_diff + w * end_diff;

        *out = val;
    }

    result
}

fn largest_power_of_two(n: usize) -> usize {
    let mut p = 1;
    while p * 2 <= n {
        p *= 2;
    }
    p
}

/// Project the tonal content of `samples` across the gap.
///
/// Forward projection evaluates the sieved spectrum at offsets past the
/// window end (`t = n + i`); backward projection evaluates it just before
/// the window start (`t = i − gap_len`).
fn extend_spectral_sieve(samples: &[f64], gap_len: usize, forward: bool) -> Vec<f64> {
    let n = samples.len();
    let mut coeffs: Vec<Complex<f64>> = samples.iter().map(|&v| Complex::new(v, 0.0)).collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut coeffs);

    let magnitudes: Vec<f64> = coeffs.iter().map(|c| c.norm()).collect();
    let threshold = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64 * SIEVE_SENSITIVITY;

    // Sieve: positive-frequency bins that are local maxima above the floor.
    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..n / 2 {
        if magnitudes[i] > threshold
            && magnitudes[i] > magnitudes[i - 1]
            && magnitudes[i] > magnitudes[i + 1]
        {
            peaks.push(i);
        }
    }

    let inv_n = 1.0 / n as f64;
    let mut result = vec![0.0; gap_len];
    for (i, out) in result.iter_mut().enumerate() {
        let t = if forward {
            (n + i) as f64
        } else {
            i as f64 - gap_len as f64
        };

        let mut sum = 0.0;
        for &p in &peaks {
            let phase = 2.0 * PI * p as f64 * t * inv_n;
            let mag = magnitudes[p] * SPECTRUM_NORMALIZATION * inv_n;
            let orig_phase = coeffs[p].im.atan2(coeffs[p].re);
            sum += mag * (phase + orig_phase).cos();
        }
        sum += coeffs[0].re * inv_n; // DC
        *out = sum;
    }
    result
}
