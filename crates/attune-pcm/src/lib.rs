//! PCM building blocks for the Attune toolkit.
//!
//! This crate provides:
//!
//! - [`PcmFormat`] and [`Format`] — the sample-encoding and stream-format model
//! - [`codec`] — per-sample encode/decode between raw bytes and `f64`
//! - [`Resampler`] — a streaming [`std::io::Read`] adapter that converts
//!   sample rate, channel count, and sample encoding in one pass

pub mod codec;
pub mod format;
pub mod resampler;

pub use format::{Format, PcmFormat};
pub use resampler::Resampler;

/// Error types for PCM operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("channel count must be non-zero")]
    ZeroChannels,

    #[error("sample format must not be undefined")]
    UndefinedFormat,

    #[error("do not know how to convert {from} channels to {to}")]
    UnsupportedChannelLayout { from: u32, to: u32 },

    #[error("read {got} bytes, which is not a multiple of {multiple_of}")]
    Misaligned { got: usize, multiple_of: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
