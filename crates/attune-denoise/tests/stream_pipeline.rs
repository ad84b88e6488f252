//! End-to-end tests for the threaded suppression pipeline.

use attune_denoise::{BypassSuppressor, ChannelFanout, FrameSuppressor, SuppressionStream};
use attune_pcm::PcmFormat;
use std::io::{Cursor, Read};

const CHUNK: usize = 480 * 4; // one RNNoise-sized mono frame

fn bypass() -> Box<dyn FrameSuppressor + Send> {
    Box::new(BypassSuppressor::rnnoise_shaped(1))
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn pipeline_is_byte_transparent() {
    let data = pattern(CHUNK * 25);
    let mut stream =
        SuppressionStream::new(Cursor::new(data.clone()), bypass(), CHUNK * 4, CHUNK * 4).unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn single_frame_rings_still_deliver_everything() {
    // The tightest legal configuration: both rings hold exactly one chunk,
    // so every stage must hand off through the backpressure waits.
    let frames = 50;
    let data = pattern(CHUNK * frames);
    let mut stream =
        SuppressionStream::new(Cursor::new(data.clone()), bypass(), CHUNK, CHUNK).unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out.len(), CHUNK * frames);
    assert_eq!(out, data);
}

#[test]
fn odd_sized_consumer_reads_preserve_order() {
    let data = pattern(CHUNK * 8);
    let mut stream =
        SuppressionStream::new(Cursor::new(data.clone()), bypass(), CHUNK * 2, CHUNK * 2).unwrap();

    // Drain through a buffer size that never aligns with the chunk size.
    let mut out = Vec::new();
    let mut buf = [0u8; 1023];
    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, data);
}

#[test]
fn stereo_fanout_streams_transparently() {
    let lanes: Vec<Box<dyn FrameSuppressor + Send>> = vec![
        Box::new(BypassSuppressor::rnnoise_shaped(1)),
        Box::new(BypassSuppressor::rnnoise_shaped(1)),
    ];
    let fanout = ChannelFanout::new(lanes).unwrap();
    assert_eq!(fanout.encoding(), (PcmFormat::F32Le, 48_000));
    let chunk = fanout.chunk_size();

    let data = pattern(chunk * 10);
    let mut stream =
        SuppressionStream::new(Cursor::new(data.clone()), Box::new(fanout), chunk * 2, chunk * 2)
            .unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn trickling_producer_reaches_the_consumer() {
    // The inner reader yields a few bytes at a time, far below the chunk
    // size; the worker must coalesce them into whole frames.
    struct Trickle {
        data: Vec<u8>,
        at: usize,
    }
    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.at == self.data.len() {
                return Ok(0);
            }
            let n = buf.len().min(8).min(self.data.len() - self.at);
            buf[..n].copy_from_slice(&self.data[self.at..self.at + n]);
            self.at += n;
            Ok(n)
        }
    }

    let data = pattern(CHUNK * 3);
    let mut stream = SuppressionStream::new(
        Trickle {
            data: data.clone(),
            at: 0,
        },
        bypass(),
        CHUNK,
        CHUNK,
    )
    .unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}
