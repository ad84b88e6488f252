//! One-shot delay estimation over whole buffers.

use crate::fft::{next_pow2, Fft};
use crate::phat::cross_correlate;
use crate::samples::to_samples;
use crate::{Error, Result};
use attune_pcm::Format;
use rustfft::num_complex::Complex;

/// Default band limits: 100 Hz – 12 kHz captures most informative audio
/// while skipping low-frequency rumble and high-frequency digital noise.
const DEFAULT_MIN_FREQ: f64 = 100.0;
const DEFAULT_MAX_FREQ: f64 = 12_000.0;

/// Shift of one comparison track against the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftEstimate {
    /// Delay in samples; positive means the comparison leads the reference.
    pub shift: f64,
    /// Peak quality in `[0, 1]`.
    pub confidence: f64,
}

/// One-shot GCC-PHAT delay estimator.
///
/// # Example
///
/// ```
/// use attune_pcm::{Format, PcmFormat};
/// use attune_sync::Syncer;
///
/// let to_bytes =
///     |samples: &[f32]| -> Vec<u8> { samples.iter().flat_map(|v| v.to_le_bytes()).collect() };
///
/// let mut reference = vec![0.0f32; 1000];
/// let mut comparison = vec![0.0f32; 1000];
/// reference[500] = 1.0;
/// comparison[490] = 1.0; // the comparison fires 10 samples early
///
/// let syncer = Syncer::new(Format::new(1, 44100, PcmFormat::F32Le)).unwrap();
/// let results = syncer
///     .calculate_shift_between(&to_bytes(&reference), &[to_bytes(&comparison)])
///     .unwrap();
/// assert!((results[0].shift - 10.0).abs() < 0.5);
/// ```
pub struct Syncer {
    format: Format,
    min_freq: f64,
    max_freq: f64,
}

impl Syncer {
    /// Create an estimator for buffers of the given format. The sample
    /// rate and channel count must be non-zero.
    pub fn new(format: Format) -> Result<Self> {
        if format.sample_rate == 0 {
            return Err(Error::ZeroSampleRate);
        }
        if format.channels == 0 {
            return Err(Error::ZeroChannels);
        }
        Ok(Self {
            format,
            min_freq: DEFAULT_MIN_FREQ,
            max_freq: DEFAULT_MAX_FREQ,
        })
    }

    /// Override the correlation band, in Hz. Zero disables that end.
    pub fn with_band(mut self, min_freq: f64, max_freq: f64) -> Self {
        self.min_freq = min_freq;
        self.max_freq = max_freq;
        self
    }

    /// Estimate the shift of each comparison buffer against `reference`.
    ///
    /// Every buffer is decoded to mono `f64` first; each pair is
    /// zero-padded to the next power of two past `n1 + n2 − 1` to avoid
    /// circular-correlation wrap-around.
    pub fn calculate_shift_between<B: AsRef<[u8]>>(
        &self,
        reference: &[u8],
        comparisons: &[B],
    ) -> Result<Vec<ShiftEstimate>> {
        let ref_samples = to_samples(self.format, reference)?;

        let mut results = Vec::with_capacity(comparisons.len());
        for comparison in comparisons {
            let comp_samples = to_samples(self.format, comparison.as_ref())?;

            let n = next_pow2((ref_samples.len() + comp_samples.len()).saturating_sub(1));

            let mut fref: Vec<Complex<f64>> =
                ref_samples.iter().map(|&v| Complex::new(v, 0.0)).collect();
            let mut fcomp: Vec<Complex<f64>> =
                comp_samples.iter().map(|&v| Complex::new(v, 0.0)).collect();
            fref.resize(n, Complex::new(0.0, 0.0));
            fcomp.resize(n, Complex::new(0.0, 0.0));

            let fft = Fft::new(n);
            fft.forward(&mut fref);
            fft.forward(&mut fcomp);

            let (shift, confidence) = cross_correlate(
                &fref,
                &fcomp,
                self.format.sample_rate as f64,
                self.min_freq,
                self.max_freq,
            )?;
            results.push(ShiftEstimate { shift, confidence });
        }
        Ok(results)
    }
}
