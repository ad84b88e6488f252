//! Audio delay estimation with GCC-PHAT.
//!
//! GCC-PHAT (Generalized Cross-Correlation with Phase Transform) estimates
//! the time shift between two signals from their phase difference in the
//! frequency domain. Normalizing every cross-spectrum bin to unit magnitude
//! makes the estimate robust against volume differences and stationary
//! noise: only phase carries delay information.
//!
//! Two front ends share the kernel:
//!
//! - [`Syncer`] — one-shot: hand it whole buffers, get one shift per
//!   comparison track
//! - [`StreamSyncer`] — streaming: push reference and comparison bytes
//!   incrementally and receive a shift estimate per analysis window, with
//!   an adaptive search/track state machine that narrows the search range
//!   once it locks on
//!
//! Sign convention everywhere: **positive shift means the comparison leads
//! the reference**; negative means it lags.

pub mod fft;
pub mod oneshot;
pub mod phat;
pub mod samples;
pub mod stream;

pub use oneshot::{ShiftEstimate, Syncer};
pub use stream::{StreamSyncer, SyncerConfig, TrackedShift};

/// Error types for delay estimation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("channel count must be non-zero")]
    ZeroChannels,

    #[error("spectra must have the same length: {left} != {right}")]
    SpectrumLengthMismatch { left: usize, right: usize },

    #[error(transparent)]
    Pcm(#[from] attune_pcm::Error),

    #[error("failed to convert PCM bytes to samples: {0}")]
    Convert(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
