//! Spectral-sieve interpolation for short audio gaps.
//!
//! Fills a dropout of known length from the tonal content of the samples
//! flanking it. See [`interpolate`] for the method.

mod sieve;

pub use sieve::{interpolate, MAX_WINDOW_SIZE, MIN_CONTEXT_SAMPLES};
