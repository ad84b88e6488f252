//! Noise-suppression streaming for the Attune toolkit.
//!
//! This crate adapts frame-based denoisers (fixed chunk size, fixed PCM
//! encoding) to arbitrary-chunked byte streams:
//!
//! - [`FrameSuppressor`] — the seam a concrete denoiser implements
//! - [`BypassSuppressor`] — a pass-through implementation for wiring and tests
//! - [`ChannelFanout`] — runs one mono suppressor per channel of an
//!   interleaved stream
//! - [`SuppressionStream`] — a backpressured [`std::io::Read`] that feeds an
//!   inner reader through a suppressor on background threads
//! - [`VoiceDetector`] — voice-activity scanning over PCM buffers

pub mod fanout;
pub mod planar;
pub mod ring;
pub mod stream;
pub mod suppressor;
pub mod vad;

pub use fanout::ChannelFanout;
pub use stream::SuppressionStream;
pub use suppressor::{BypassSuppressor, FrameSuppressor};
pub use vad::VoiceDetector;

/// Error types for noise-suppression operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input of {got} bytes is smaller than one chunk of {chunk} bytes")]
    ChunkTooSmall { got: usize, chunk: usize },

    #[error("input and output lengths differ: {input} != {output}")]
    LengthMismatch { input: usize, output: usize },

    #[error("buffer of {got} bytes is not a multiple of the {chunk}-byte chunk")]
    NotChunkAligned { got: usize, chunk: usize },

    #[error("read {got} bytes, which is not a multiple of {multiple_of}")]
    Misaligned { got: usize, multiple_of: usize },

    #[error("ring capacity of {capacity} bytes cannot hold one {chunk}-byte chunk")]
    CapacityTooSmall { capacity: usize, chunk: usize },

    #[error("upstream reader failed: {0}")]
    Upstream(#[from] std::io::Error),

    #[error("suppression stream was shut down")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
