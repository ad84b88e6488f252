//! Streaming delay tracking with an adaptive search window.
//!
//! [`StreamSyncer`] consumes a reference stream and any number of
//! comparison streams in arbitrary-sized pushes and emits one
//! [`TrackedShift`] per analysis window. Per comparison track it runs a
//! two-state machine:
//!
//! - **Search** — correlate the window against a reference span of
//!   `window + 2·max_lag` samples, wide enough to find the delay anywhere
//!   in range.
//! - **Track** — once two consecutive windows clear the search threshold,
//!   center the span on the last confirmed shift and shrink the lag range
//!   to one window, cutting the FFT size (and CPU) sharply while the lock
//!   holds.
//!
//! Confidence thresholds are relative to the whitened noise floor: for
//! `B` active bins, an uncorrelated signal peaks near `1/√B`, so Search
//! demands `10/√B` and Track keeps the lock down to `5/√B`. Dropping below
//! the track threshold falls back to Search.

use crate::fft::{hann_window, next_pow2, Fft};
use crate::phat::cross_correlate;
use crate::samples::to_samples;
use crate::{Error, Result};
use attune_pcm::Format;
use rustfft::num_complex::Complex;
use std::collections::HashMap;

/// Analysis window length when none is configured: the power of two
/// closest above 400 ms of signal.
const DEFAULT_WINDOW_DURATION_SECS: f64 = 0.4;

/// Overlap between consecutive windows when no hop is configured.
const DEFAULT_OVERLAP_FACTOR: f64 = 0.5;

/// Default searchable delay range: ±5 seconds.
const DEFAULT_MAX_LAG_SECS: u32 = 5;

/// Confidence multiple of the noise floor required to enter Track mode.
/// High, so only strong clear peaks can lock.
const THRESHOLD_SEARCH_MULTIPLIER: f64 = 10.0;

/// Confidence multiple of the noise floor required to stay in Track mode.
/// Lower than the search multiple, so a temporary dip does not lose the
/// lock.
const THRESHOLD_TRACK_MULTIPLIER: f64 = 5.0;

/// Shift detected for one analysis window of a comparison track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedShift {
    /// Global sample index of the analysis window in the comparison stream.
    pub sample_offset: i64,
    /// Delay in samples; positive means the comparison leads the reference.
    pub shift: f64,
    /// Peak quality in `[0, 1]`.
    pub confidence: f64,
}

/// Configuration for [`StreamSyncer`]. Zero fields take defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncerConfig {
    /// Samples correlated per analysis window. Default: ≥ 400 ms, power
    /// of two.
    pub window_size: usize,
    /// Stride between windows. Default: half the window.
    pub hop_size: usize,
    /// Maximum searchable delay, in samples, in either direction.
    /// Default: 5 seconds.
    pub max_lag: usize,
    /// Correlation band lower bound in Hz. Default (with `max_freq` also
    /// zero): 100 Hz.
    pub min_freq: f64,
    /// Correlation band upper bound in Hz. Default (with `min_freq` also
    /// zero): 12 kHz.
    pub max_freq: f64,
}

/// Per-comparison-track correlation state.
struct TrackState {
    /// Circular buffer of comparison samples, addressed by global index
    /// modulo length.
    comp_buffer: Vec<f64>,
    /// Total samples pushed to this track.
    comp_count: i64,
    /// Global index of the last completed analysis window.
    last_analysis_pos: i64,
    /// Preallocated FFT scratch.
    fcomp: Vec<Complex<f64>>,
    /// Last confirmed delay; centers the Track-mode span.
    last_successful_shift: f64,
    /// High-confidence lock on the delay.
    is_tracking: bool,
    /// Consecutive windows above the confidence threshold.
    consecutive_high_conf: u32,
}

/// Streaming GCC-PHAT syncer over one reference and N comparison tracks.
///
/// Track state is created lazily on the first push for a track id. The
/// reference buffer is addressed by global sample index modulo its length;
/// a window that asks for reference data already overwritten (or not yet
/// pushed) reads zeros there and simply scores a lower confidence.
pub struct StreamSyncer {
    format: Format,
    window_size: usize,
    hop_size: usize,
    max_lag: usize,
    min_freq: f64,
    max_freq: f64,
    ref_buffer: Vec<f64>,
    ref_count: i64,
    hann: Vec<f64>,
    /// Preallocated FFT scratch, sized for full Search mode.
    fref: Vec<Complex<f64>>,
    tracks: HashMap<u32, TrackState>,
}

impl StreamSyncer {
    /// Create a syncer for streams of the given format. The sample rate
    /// and channel count must be non-zero; zero config fields take the
    /// documented defaults.
    pub fn new(format: Format, config: SyncerConfig) -> Result<Self> {
        if format.sample_rate == 0 {
            return Err(Error::ZeroSampleRate);
        }
        if format.channels == 0 {
            return Err(Error::ZeroChannels);
        }
        let sample_rate = format.sample_rate;

        let window_size = if config.window_size == 0 {
            next_pow2((sample_rate as f64 * DEFAULT_WINDOW_DURATION_SECS) as usize)
        } else {
            config.window_size
        };
        let hop_size = if config.hop_size == 0 {
            (window_size as f64 * DEFAULT_OVERLAP_FACTOR) as usize
        } else {
            config.hop_size
        };
        let max_lag = if config.max_lag == 0 {
            (sample_rate * DEFAULT_MAX_LAG_SECS) as usize
        } else {
            config.max_lag
        };
        let (mut min_freq, mut max_freq) = (config.min_freq, config.max_freq);
        if min_freq == 0.0 && max_freq == 0.0 {
            min_freq = 100.0;
            max_freq = 12_000.0;
        }

        // Room for the full search span plus slack before old samples are
        // overwritten.
        let buffer_size = (max_lag + window_size) * 4;
        let fft_size = optimal_fft_size(window_size, max_lag);

        Ok(Self {
            format,
            window_size,
            hop_size,
            max_lag,
            min_freq,
            max_freq,
            ref_buffer: vec![0.0; buffer_size],
            ref_count: 0,
            hann: hann_window(window_size),
            fref: vec![Complex::new(0.0, 0.0); fft_size],
            tracks: HashMap::new(),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    /// Feed reference-stream bytes.
    pub fn push_reference(&mut self, data: &[u8]) -> Result<()> {
        let samples = to_samples(self.format, data)?;
        let len = self.ref_buffer.len() as i64;
        for v in samples {
            self.ref_buffer[(self.ref_count % len) as usize] = v;
            self.ref_count += 1;
        }
        Ok(())
    }

    /// Feed comparison-stream bytes for `track_id` and collect the shifts
    /// of every analysis window that became complete.
    pub fn push_comparison(&mut self, track_id: u32, data: &[u8]) -> Result<Vec<TrackedShift>> {
        let samples = to_samples(self.format, data)?;

        let buffer_size = self.ref_buffer.len();
        let fft_size = self.fref.len();
        let hop_size = self.hop_size;
        let ts = self.tracks.entry(track_id).or_insert_with(|| TrackState {
            comp_buffer: vec![0.0; buffer_size],
            comp_count: 0,
            last_analysis_pos: -(hop_size as i64),
            fcomp: vec![Complex::new(0.0, 0.0); fft_size],
            last_successful_shift: 0.0,
            is_tracking: false,
            consecutive_high_conf: 0,
        });

        let comp_len = ts.comp_buffer.len() as i64;
        for v in samples {
            ts.comp_buffer[(ts.comp_count % comp_len) as usize] = v;
            ts.comp_count += 1;
        }

        let mut results = Vec::new();
        loop {
            // Split-borrow the track out of self for the analysis call.
            let ts = self.tracks.get_mut(&track_id).expect("track just inserted");

            let next_pos = ts.last_analysis_pos + self.hop_size as i64;
            if next_pos + self.window_size as i64 > ts.comp_count {
                break;
            }

            // Search scans the full lag range from the window position;
            // Track centers a one-window range on the last known shift.
            let mut max_lag = self.max_lag;
            let mut search_start = next_pos + ts.last_successful_shift as i64;
            if !ts.is_tracking {
                search_start = next_pos;
            } else {
                max_lag = self.window_size;
            }

            if search_start < 0 {
                search_start = 0;
            }
            if search_start + self.window_size as i64 > self.ref_count {
                break;
            }

            let (shift, confidence, active_bins) =
                analyze(
                    &mut self.fref,
                    &self.ref_buffer,
                    self.ref_count,
                    &self.hann,
                    self.window_size,
                    self.format.sample_rate as f64,
                    (self.min_freq, self.max_freq),
                    ts,
                    next_pos,
                    search_start,
                    max_lag,
                )?;

            let search_origin = search_start - max_lag as i64;
            let total_shift = (search_origin - next_pos) as f64 + shift;

            // Thresholds relative to the uncorrelated-noise peak 1/√B.
            let noise_floor = 1.0 / (active_bins as f64).sqrt();
            let threshold_search = noise_floor * THRESHOLD_SEARCH_MULTIPLIER;
            let threshold_track = noise_floor * THRESHOLD_TRACK_MULTIPLIER;

            if confidence > threshold_search {
                ts.last_successful_shift = total_shift;
                ts.consecutive_high_conf += 1;
                // A couple of consecutive strong hits means a real lock,
                // not a lucky peak.
                if ts.consecutive_high_conf >= 2 {
                    ts.is_tracking = true;
                }
            } else if ts.is_tracking && confidence > threshold_track {
                ts.last_successful_shift = total_shift;
                ts.consecutive_high_conf += 1;
            } else if confidence < threshold_track {
                ts.is_tracking = false;
                ts.consecutive_high_conf = 0;
            }

            results.push(TrackedShift {
                sample_offset: next_pos,
                shift: total_shift,
                confidence,
            });
            ts.last_analysis_pos = next_pos;
        }
        Ok(results)
    }
}

/// FFT size for full Search mode: `2^k ≥ window + max_lag`, doubled for
/// linear (non-circular) correlation headroom.
fn optimal_fft_size(window_size: usize, max_lag: usize) -> usize {
    next_pow2(window_size + max_lag) << 1
}

/// Correlate one comparison window against one reference span.
///
/// The span starts `max_lag` samples before `search_start` and covers
/// `window + 2·max_lag` samples, so shifts in both directions are visible.
/// Returns the local shift, the confidence, and the active-bin count used
/// for the confidence floor.
#[allow(clippy::too_many_arguments)]
fn analyze(
    fref_scratch: &mut [Complex<f64>],
    ref_buffer: &[f64],
    ref_count: i64,
    hann: &[f64],
    window_size: usize,
    sample_rate: f64,
    band: (f64, f64),
    ts: &mut TrackState,
    pos: i64,
    search_start: i64,
    max_lag: usize,
) -> Result<(f64, f64, usize)> {
    let search_origin = search_start - max_lag as i64;
    let search_samples = window_size + 2 * max_lag;

    // Linear correlation needs 2^k ≥ window + span − 1, i.e.
    // 2·window + 2·max_lag − 1; cap at the preallocated size.
    let target = 2 * window_size + 2 * max_lag - 1;
    let n = next_pow2(target).min(fref_scratch.len());

    let fref = &mut fref_scratch[..n];
    let fcomp = &mut ts.fcomp[..n];
    fref.fill(Complex::new(0.0, 0.0));
    fcomp.fill(Complex::new(0.0, 0.0));

    // Comparison window, Hann-tapered.
    let comp_len = ts.comp_buffer.len() as i64;
    for i in 0..window_size {
        let v = ts.comp_buffer[((pos + i as i64) % comp_len) as usize];
        fcomp[i] = Complex::new(v * hann[i], 0.0);
    }

    // Reference span; indices outside the retained window read as zeros.
    let ref_len = ref_buffer.len() as i64;
    for i in 0..search_samples.min(n) {
        let global_idx = search_origin + i as i64;
        if global_idx >= 0 && global_idx >= ref_count - ref_len && global_idx < ref_count {
            let mut actual = global_idx % ref_len;
            if actual < 0 {
                actual += ref_len;
            }
            fref[i] = Complex::new(ref_buffer[actual as usize], 0.0);
        }
    }

    let fft = Fft::new(n);
    fft.forward(fref);
    fft.forward(fcomp);

    let (min_freq, max_freq) = band;
    let (shift, confidence) = cross_correlate(fref, fcomp, sample_rate, min_freq, max_freq)?;

    // Bin count inside the band, mirrored halves included; it feeds the
    // noise-floor estimate, so clamp away zero.
    let bin_min = (min_freq * n as f64 / sample_rate) as usize;
    let mut bin_max = n / 2;
    if max_freq > 0.0 && max_freq < sample_rate / 2.0 {
        bin_max = (max_freq * n as f64 / sample_rate) as usize;
    }
    let active_bins = (2 * bin_max.saturating_sub(bin_min)).max(1);

    Ok((shift, confidence, active_bins))
}
