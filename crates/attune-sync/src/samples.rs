//! Byte buffer → mono `f64` sample extraction.

use crate::Result;
use attune_pcm::{Format, PcmFormat, Resampler};
use std::io::Read;

/// Decode an interleaved PCM byte buffer into mono `f64` samples.
///
/// Routes the buffer through the streaming resampler with an output format
/// of `(1 channel, same rate, F64LE)`, so multi-channel input is mixed down
/// by channel averaging — the same mix-down every other conversion in the
/// toolkit uses.
pub fn to_samples(format: Format, data: &[u8]) -> Result<Vec<f64>> {
    let out_format = Format::new(1, format.sample_rate, PcmFormat::F64Le);
    let mut resampler = Resampler::new(format, data, out_format)?;

    let num_samples = data.len() / format.bytes_per_frame();
    let mut raw = vec![0u8; num_samples * 8];
    let n = resampler.read(&mut raw)?;

    let samples = raw[..n]
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
        .collect();
    Ok(samples)
}
