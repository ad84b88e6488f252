//! Multi-channel suppression over single-channel backends.

use crate::planar::{planarize, unplanarize};
use crate::suppressor::{validate_frames, FrameSuppressor};
use crate::{Error, Result};
use attune_pcm::PcmFormat;
use std::thread;

/// Runs one mono suppressor per channel of an interleaved stream.
///
/// Most denoiser backends model a single channel. `ChannelFanout` makes N
/// of them look like one N-channel [`FrameSuppressor`]: each chunk is
/// planarized, every channel run is suppressed on its own thread, the
/// voice-activity probability is the maximum across channels, and the
/// result is interleaved again.
pub struct ChannelFanout {
    lanes: Vec<Box<dyn FrameSuppressor + Send>>,
    encoding: (PcmFormat, u32),
    chunk_size: usize,
    planar_in: Vec<u8>,
    planar_out: Vec<u8>,
}

impl ChannelFanout {
    /// Combine `lanes` (one mono suppressor per output channel, identical
    /// encoding and chunk size) into a multi-channel suppressor.
    pub fn new(lanes: Vec<Box<dyn FrameSuppressor + Send>>) -> Result<Self> {
        let first = lanes.first().ok_or(Error::ChunkTooSmall { got: 0, chunk: 1 })?;
        let encoding = first.encoding();
        let lane_chunk = first.chunk_size();

        for lane in &lanes {
            if lane.channels() != 1 {
                return Err(Error::LengthMismatch {
                    input: lane.channels() as usize,
                    output: 1,
                });
            }
            if lane.encoding() != encoding || lane.chunk_size() != lane_chunk {
                return Err(Error::NotChunkAligned {
                    got: lane.chunk_size(),
                    chunk: lane_chunk,
                });
            }
        }

        let chunk_size = lane_chunk * lanes.len();
        Ok(Self {
            lanes,
            encoding,
            chunk_size,
            planar_in: Vec::new(),
            planar_out: Vec::new(),
        })
    }
}

impl FrameSuppressor for ChannelFanout {
    fn encoding(&self) -> (PcmFormat, u32) {
        self.encoding
    }

    fn channels(&self) -> u32 {
        self.lanes.len() as u32
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn suppress(&mut self, input: &[u8], output: &mut [u8]) -> Result<f64> {
        validate_frames(self.chunk_size, input, output)?;

        let channels = self.lanes.len();
        let sample_size = self.encoding.0.bytes_per_sample();
        if self.planar_in.len() < input.len() {
            self.planar_in.resize(input.len(), 0);
            self.planar_out.resize(input.len(), 0);
        }
        let planar_in = &mut self.planar_in[..input.len()];
        let planar_out = &mut self.planar_out[..input.len()];

        planarize(channels as u32, sample_size, planar_in, input)?;

        let lane_len = input.len() / channels;
        let mut max_vad = 0.0f64;

        thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::with_capacity(channels);
            for ((lane, in_run), out_run) in self
                .lanes
                .iter_mut()
                .zip(planar_in.chunks(lane_len))
                .zip(planar_out.chunks_mut(lane_len))
            {
                handles.push(scope.spawn(move || lane.suppress(in_run, out_run)));
            }
            for handle in handles {
                let vad = handle.join().expect("suppressor lane panicked")?;
                if vad > max_vad {
                    max_vad = vad;
                }
            }
            Ok(())
        })?;

        unplanarize(channels as u32, sample_size, output, planar_out)?;
        Ok(max_vad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suppressor::BypassSuppressor;

    /// Test suppressor that scales every byte and reports a fixed VAD.
    struct Scale {
        factor: u8,
        vad: f64,
        chunk: usize,
    }

    impl FrameSuppressor for Scale {
        fn encoding(&self) -> (PcmFormat, u32) {
            (PcmFormat::U8, 48_000)
        }
        fn channels(&self) -> u32 {
            1
        }
        fn chunk_size(&self) -> usize {
            self.chunk
        }
        fn suppress(&mut self, input: &[u8], output: &mut [u8]) -> Result<f64> {
            validate_frames(self.chunk, input, output)?;
            for (o, &i) in output.iter_mut().zip(input) {
                *o = i.wrapping_mul(self.factor);
            }
            Ok(self.vad)
        }
    }

    #[test]
    fn test_fanout_keeps_interleaving() {
        let lanes: Vec<Box<dyn FrameSuppressor + Send>> = vec![
            Box::new(BypassSuppressor::new((PcmFormat::U8, 48_000), 1, 4)),
            Box::new(BypassSuppressor::new((PcmFormat::U8, 48_000), 1, 4)),
        ];
        let mut fanout = ChannelFanout::new(lanes).unwrap();
        assert_eq!(fanout.chunk_size(), 8);
        assert_eq!(fanout.channels(), 2);

        let input: Vec<u8> = (1..=8).collect();
        let mut output = vec![0u8; 8];
        fanout.suppress(&input, &mut output).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_fanout_routes_channels_independently() {
        let lanes: Vec<Box<dyn FrameSuppressor + Send>> = vec![
            Box::new(Scale { factor: 1, vad: 0.2, chunk: 4 }),
            Box::new(Scale { factor: 3, vad: 0.9, chunk: 4 }),
        ];
        let mut fanout = ChannelFanout::new(lanes).unwrap();

        // Interleaved [L R L R ...]: left lane passes through, right triples.
        let input = [1u8, 1, 2, 2, 3, 3, 4, 4];
        let mut output = [0u8; 8];
        let vad = fanout.suppress(&input, &mut output).unwrap();

        assert_eq!(output, [1, 3, 2, 6, 3, 9, 4, 12]);
        // Max VAD across channels wins.
        assert!((vad - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_fanout_rejects_mismatched_lanes() {
        let lanes: Vec<Box<dyn FrameSuppressor + Send>> = vec![
            Box::new(BypassSuppressor::new((PcmFormat::U8, 48_000), 1, 4)),
            Box::new(BypassSuppressor::new((PcmFormat::U8, 48_000), 1, 8)),
        ];
        assert!(ChannelFanout::new(lanes).is_err());
    }
}
