//! The frame-denoiser seam.

use attune_pcm::PcmFormat;

/// A frame-based noise suppressor.
///
/// Implementations consume and produce whole chunks: `suppress` is handed
/// buffers whose length is a positive multiple of [`chunk_size`] bytes and
/// transforms them in FIFO order. The returned scalar is the voice-activity
/// probability of the processed block, in `[0, 1]`.
///
/// A chunk covers one denoiser frame across every channel, so
/// `chunk_size` is always a multiple of `bytes_per_sample * channels`.
/// An RNNoise-style backend, for example, reports 48 kHz F32LE, 480
/// samples per channel, i.e. a `480 * channels * 4`-byte chunk.
///
/// [`chunk_size`]: FrameSuppressor::chunk_size
pub trait FrameSuppressor {
    /// PCM encoding and sample rate the suppressor operates on.
    fn encoding(&self) -> (PcmFormat, u32);

    /// Number of interleaved channels per chunk.
    fn channels(&self) -> u32;

    /// Size of one processing chunk in bytes.
    fn chunk_size(&self) -> usize;

    /// Denoise `input` into `output`, returning the voice-activity
    /// probability. Both buffers must be the same length and a positive
    /// multiple of [`chunk_size`](FrameSuppressor::chunk_size).
    fn suppress(&mut self, input: &[u8], output: &mut [u8]) -> crate::Result<f64>;
}

/// A suppressor that copies input to output unchanged.
///
/// Useful for exercising the streaming machinery without a denoiser
/// backend; reports a voice-activity probability of 1.0.
pub struct BypassSuppressor {
    encoding: (PcmFormat, u32),
    channels: u32,
    chunk_size: usize,
}

impl BypassSuppressor {
    /// A bypass with the shape of an RNNoise backend: 48 kHz F32LE,
    /// 480 samples per channel per chunk.
    pub fn rnnoise_shaped(channels: u32) -> Self {
        Self::new((PcmFormat::F32Le, 48_000), channels, 480 * channels as usize * 4)
    }

    pub fn new(encoding: (PcmFormat, u32), channels: u32, chunk_size: usize) -> Self {
        assert!(
            chunk_size > 0
                && chunk_size % (encoding.0.bytes_per_sample() * channels as usize) == 0,
            "chunk size must be a positive multiple of bytes_per_sample * channels"
        );
        Self {
            encoding,
            channels,
            chunk_size,
        }
    }
}

impl FrameSuppressor for BypassSuppressor {
    fn encoding(&self) -> (PcmFormat, u32) {
        self.encoding
    }

    fn channels(&self) -> u32 {
        self.channels
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn suppress(&mut self, input: &[u8], output: &mut [u8]) -> crate::Result<f64> {
        validate_frames(self.chunk_size, input, output)?;
        output.copy_from_slice(input);
        Ok(1.0)
    }
}

/// Shared argument validation for suppressor implementations.
pub(crate) fn validate_frames(chunk_size: usize, input: &[u8], output: &[u8]) -> crate::Result<()> {
    if input.len() != output.len() {
        return Err(crate::Error::LengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }
    if input.len() < chunk_size {
        return Err(crate::Error::ChunkTooSmall {
            got: input.len(),
            chunk: chunk_size,
        });
    }
    if input.len() % chunk_size != 0 {
        return Err(crate::Error::NotChunkAligned {
            got: input.len(),
            chunk: chunk_size,
        });
    }
    Ok(())
}
