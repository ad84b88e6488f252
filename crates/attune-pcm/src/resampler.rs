//! Streaming PCM conversion — sample rate, channel count, and encoding in
//! one pass.
//!
//! [`Resampler`] wraps any byte [`Read`] carrying interleaved PCM and
//! exposes another byte [`Read`] in a different [`Format`]. Rate conversion
//! is nearest-neighbour over a fixed-point virtual timeline: each input
//! sample advances an input cursor by [`DISTANCE_STEP`] units and each
//! output sample advances an output cursor by
//! `DISTANCE_STEP * in_rate / out_rate`; whichever cursor lags emits or
//! consumes next. There is no anti-aliasing filter — the converter trades
//! passband quality for zero latency, O(1) state, and a bounded per-call
//! scratch, which is what a live capture path needs.
//!
//! Channel policies: equal counts copy through, mono fans out to every
//! output channel, and N input channels average down to mono. Any other
//! mapping is rejected at construction.

use crate::codec::{read_sample, write_sample};
use crate::{Error, Format, PcmFormat};
use std::io::{self, Read};

/// Virtual-timeline units per input sample.
pub const DISTANCE_STEP: u64 = 10_000;

/// Streaming format converter over an inner byte reader.
///
/// `read` does not guarantee a full buffer: it returns whatever could be
/// produced from a single inner read, and `Ok(0)` only once the inner
/// stream is exhausted (or the destination cannot hold one output frame).
///
/// # Example
///
/// ```
/// use attune_pcm::{Format, PcmFormat, Resampler};
/// use std::io::Read;
///
/// let mono = [10u8, 20, 30];
/// let inf = Format::new(1, 44100, PcmFormat::U8);
/// let outf = Format::new(2, 44100, PcmFormat::U8);
/// let mut r = Resampler::new(inf, &mono[..], outf).unwrap();
///
/// let mut out = [0u8; 6];
/// let n = r.read(&mut out).unwrap();
/// assert_eq!(&out[..n], &[10, 10, 20, 20, 30, 30]);
/// ```
#[derive(Debug)]
pub struct Resampler<R> {
    inner: R,
    in_format: Format,
    out_format: Format,
    in_sample_size: usize,
    out_sample_size: usize,
    /// Input channels averaged into each output value (N→mono), else 1.
    in_num_avg: usize,
    /// Copies of each value written per output frame (mono→N), else 1.
    out_num_repeat: usize,
    out_distance_step: u64,
    in_distance: u64,
    out_distance: u64,
    scratch: Vec<u8>,
}

impl<R: Read> Resampler<R> {
    /// Build a converter from `in_format` (as delivered by `inner`) to
    /// `out_format`.
    ///
    /// Fails when either sample rate is zero, either encoding is
    /// [`PcmFormat::Undefined`], either channel count is zero, or the
    /// channel mapping is neither identity, mono→N, nor N→mono.
    pub fn new(in_format: Format, inner: R, out_format: Format) -> crate::Result<Self> {
        if in_format.sample_rate == 0 || out_format.sample_rate == 0 {
            return Err(Error::ZeroSampleRate);
        }
        if in_format.pcm == PcmFormat::Undefined || out_format.pcm == PcmFormat::Undefined {
            return Err(Error::UndefinedFormat);
        }
        if in_format.channels == 0 || out_format.channels == 0 {
            return Err(Error::ZeroChannels);
        }

        let mut in_num_avg = 1;
        let mut out_num_repeat = 1;
        if in_format.channels != out_format.channels {
            if in_format.channels == 1 {
                out_num_repeat = out_format.channels as usize;
            } else if out_format.channels == 1 {
                in_num_avg = in_format.channels as usize;
            } else {
                return Err(Error::UnsupportedChannelLayout {
                    from: in_format.channels,
                    to: out_format.channels,
                });
            }
        }

        let rate_adjust = out_format.sample_rate as f64 / in_format.sample_rate as f64;
        let out_distance_step = (DISTANCE_STEP as f64 / rate_adjust) as u64;

        Ok(Self {
            inner,
            in_format,
            out_format,
            in_sample_size: in_format.bytes_per_sample(),
            out_sample_size: out_format.bytes_per_sample(),
            in_num_avg,
            out_num_repeat,
            out_distance_step,
            in_distance: 0,
            out_distance: 0,
            scratch: Vec::new(),
        })
    }

    /// Format of the bytes consumed from the inner reader.
    pub fn in_format(&self) -> Format {
        self.in_format
    }

    /// Format of the bytes produced by [`Read::read`].
    pub fn out_format(&self) -> Format {
        self.out_format
    }

    /// Consume the converter, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Resampler<R> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        let out_chunk_bytes = self.out_sample_size * self.out_num_repeat;
        let max_out_chunks = p.len() / out_chunk_bytes;
        if max_out_chunks == 0 {
            return Ok(0);
        }

        // Estimate how much input one output buffer corresponds to; at
        // least one chunk so a tiny destination still makes progress.
        let mut chunks_to_read = (max_out_chunks as f64 * self.in_format.sample_rate as f64
            / self.out_format.sample_rate as f64) as usize;
        if chunks_to_read == 0 {
            chunks_to_read = 1;
        }

        let in_chunk_bytes = self.in_sample_size * self.in_num_avg;
        let bytes_to_read = chunks_to_read * in_chunk_bytes;
        if self.scratch.len() < bytes_to_read {
            self.scratch.resize(bytes_to_read, 0);
        }

        let n = self.inner.read(&mut self.scratch[..bytes_to_read])?;
        if n > 0 && n % in_chunk_bytes != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                Error::Misaligned {
                    got: n,
                    multiple_of: in_chunk_bytes,
                },
            ));
        }
        let chunks_read = n / in_chunk_bytes;

        let mut dst = 0usize;
        let mut src = 0usize;
        while src < chunks_read && dst < max_out_chunks {
            // Downsampling: the output cursor lags, drop input chunks
            // until the timelines meet again.
            while self.in_distance < self.out_distance && src < chunks_read {
                src += 1;
                self.in_distance += DISTANCE_STEP;
            }
            if src >= chunks_read {
                break;
            }

            let at = src * in_chunk_bytes;
            let mut sum = 0.0f64;
            for ch in 0..self.in_num_avg {
                sum += read_sample(
                    self.in_format.pcm,
                    &self.scratch[at + ch * self.in_sample_size..],
                );
            }
            let val = sum / self.in_num_avg as f64;

            // Upsampling: emit the value (repeated per output channel)
            // until the output cursor catches up.
            while dst < max_out_chunks && self.out_distance <= self.in_distance {
                for rep in 0..self.out_num_repeat {
                    let at = (dst * self.out_num_repeat + rep) * self.out_sample_size;
                    write_sample(self.out_format.pcm, &mut p[at..], val);
                }
                dst += 1;
                self.out_distance += self.out_distance_step;
            }

            src += 1;
            self.in_distance += DISTANCE_STEP;
        }

        Ok(dst * out_chunk_bytes)
    }
}
