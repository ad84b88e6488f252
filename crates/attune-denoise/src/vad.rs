//! Voice-activity scanning on top of a frame suppressor.

use crate::suppressor::FrameSuppressor;
use crate::Result;
use attune_pcm::Format;
use std::time::Duration;

/// Finds voice in PCM buffers using a suppressor's per-frame
/// voice-activity probability.
///
/// The detector scans a buffer in blocks of one or more suppressor chunks,
/// sized as close to a preferred time granularity as the chunk size
/// allows, and reports where speech starts.
pub struct VoiceDetector {
    suppressor: Box<dyn FrameSuppressor + Send>,
    block_size: usize,
    block_duration: Duration,
    scratch: Vec<u8>,
}

impl VoiceDetector {
    /// Wrap `suppressor`, scanning in blocks of roughly
    /// `preferred_granularity` (rounded to whole suppressor chunks, at
    /// least one).
    pub fn new(
        suppressor: Box<dyn FrameSuppressor + Send>,
        preferred_granularity: Duration,
    ) -> Self {
        let chunk_size = suppressor.chunk_size();
        let (pcm, sample_rate) = suppressor.encoding();
        let format = Format::new(suppressor.channels(), sample_rate, pcm);

        let preferred_bytes = format.bytes_for_duration(preferred_granularity) as usize;
        let sub_chunks = ((preferred_bytes + chunk_size / 2) / chunk_size).max(1);
        let block_size = sub_chunks * chunk_size;

        let block_samples = block_size / format.bytes_per_frame();
        let block_duration =
            Duration::from_nanos(1_000_000_000 * block_samples as u64 / sample_rate as u64);

        Self {
            suppressor,
            block_size,
            block_duration,
            scratch: vec![0; block_size],
        }
    }

    /// Bytes covered by one scan block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Time covered by one scan block.
    pub fn block_duration(&self) -> Duration {
        self.block_duration
    }

    /// Scan `samples` for voice activity.
    ///
    /// Returns the maximum voice-activity probability seen and the offset
    /// of the first block whose probability reached
    /// `confidence_threshold`, or `None` if no block did. Scanning stops
    /// early once at least `min_duration` worth of voiced blocks has
    /// accumulated; a trailing partial block is not scanned.
    pub fn find_next_voice(
        &mut self,
        samples: &[u8],
        confidence_threshold: f64,
        min_duration: Duration,
    ) -> Result<(f64, Option<Duration>)> {
        let mut max_confidence = 0.0f64;
        let mut first_detection = None;
        let mut voiced_for = Duration::ZERO;

        for (pos, block) in samples.chunks_exact(self.block_size).enumerate() {
            let confidence = self.suppressor.suppress(block, &mut self.scratch)?;
            if confidence > max_confidence {
                max_confidence = confidence;
            }

            if confidence >= confidence_threshold {
                voiced_for += self.block_duration;
                if first_detection.is_none() {
                    first_detection = Some(self.block_duration * pos as u32);
                }
            }

            if voiced_for >= min_duration {
                break;
            }
        }

        Ok((max_confidence, first_detection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attune_pcm::PcmFormat;

    /// Reports a fixed per-block VAD sequence; copies input through.
    struct Scripted {
        vads: Vec<f64>,
        at: usize,
        chunk: usize,
    }

    impl FrameSuppressor for Scripted {
        fn encoding(&self) -> (PcmFormat, u32) {
            (PcmFormat::F32Le, 48_000)
        }
        fn channels(&self) -> u32 {
            1
        }
        fn chunk_size(&self) -> usize {
            self.chunk
        }
        fn suppress(&mut self, input: &[u8], output: &mut [u8]) -> Result<f64> {
            output.copy_from_slice(input);
            let vad = self.vads[self.at % self.vads.len()];
            self.at += 1;
            Ok(vad)
        }
    }

    // One 480-sample chunk at 48 kHz is 10 ms.
    const CHUNK: usize = 480 * 4;

    #[test]
    fn test_block_rounding() {
        let detector = VoiceDetector::new(
            Box::new(Scripted {
                vads: vec![0.0],
                at: 0,
                chunk: CHUNK,
            }),
            Duration::from_millis(25),
        );
        // 25 ms is 2.5 chunks; rounding lands on three 10 ms chunks.
        assert_eq!(detector.block_size(), CHUNK * 3);
        assert_eq!(detector.block_duration(), Duration::from_millis(30));
    }

    #[test]
    fn test_finds_first_voiced_block() {
        let mut detector = VoiceDetector::new(
            Box::new(Scripted {
                vads: vec![0.1, 0.2, 0.9, 0.9],
                at: 0,
                chunk: CHUNK,
            }),
            Duration::from_millis(10),
        );

        let samples = vec![0u8; CHUNK * 4];
        let (max_conf, first) = detector
            .find_next_voice(&samples, 0.5, Duration::from_millis(10))
            .unwrap();

        assert!((max_conf - 0.9).abs() < 1e-12);
        // Voice starts at the third 10 ms block.
        assert_eq!(first, Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_silence_reports_none() {
        let mut detector = VoiceDetector::new(
            Box::new(Scripted {
                vads: vec![0.05],
                at: 0,
                chunk: CHUNK,
            }),
            Duration::from_millis(10),
        );

        let samples = vec![0u8; CHUNK * 8];
        let (max_conf, first) = detector
            .find_next_voice(&samples, 0.5, Duration::from_millis(30))
            .unwrap();
        assert!((max_conf - 0.05).abs() < 1e-12);
        assert_eq!(first, None);
    }

    #[test]
    fn test_empty_input() {
        let mut detector = VoiceDetector::new(
            Box::new(Scripted {
                vads: vec![1.0],
                at: 0,
                chunk: CHUNK,
            }),
            Duration::from_millis(10),
        );
        let (max_conf, first) = detector
            .find_next_voice(&[], 0.5, Duration::from_millis(10))
            .unwrap();
        assert_eq!(max_conf, 0.0);
        assert_eq!(first, None);
    }
}
