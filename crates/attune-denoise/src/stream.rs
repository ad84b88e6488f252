//! Backpressured streaming around a frame suppressor.
//!
//! [`SuppressionStream`] turns a [`FrameSuppressor`] — which only eats
//! fixed-size chunks — into a byte [`Read`] over arbitrary chunk sizes.
//! Three roles run concurrently:
//!
//! - a **producer** thread reads the inner stream and feeds the input ring,
//! - a **worker** thread coalesces whole chunks out of the input ring, runs
//!   the suppressor, and feeds the output ring,
//! - the **consumer** is whoever calls [`Read::read`] and drains the output
//!   ring.
//!
//! Each ring has a mutex and two condvars: one wakes the side waiting for
//! data, the other the side waiting for space. Every mutation notifies all
//! waiters of the opposite side, so a full or empty ring is a control
//! signal rather than an error. Byte order is FIFO end to end: output
//! equals input, transformed chunk by chunk, with no reordering.
//!
//! The first error from either background role is latched and handed to
//! the consumer once the already-suppressed bytes have been drained. A
//! trailing partial chunk at end of input is discarded, since the
//! suppressor cannot process it.

use crate::ring::RingBuffer;
use crate::suppressor::FrameSuppressor;
use crate::Error;
use parking_lot::{Condvar, Mutex};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Producer-side scratch ceiling per inner read.
const READ_SCRATCH_SIZE: usize = 64 * 1024;

struct InputState {
    ring: RingBuffer,
    /// Inner reader reached end of stream (or failed).
    done: bool,
}

struct OutputState {
    ring: RingBuffer,
    /// No more suppressed bytes will ever arrive.
    done: bool,
    /// First error from the producer or worker, surfaced by `read` once
    /// the ring is drained.
    error: Option<Error>,
}

struct Shared {
    input: Mutex<InputState>,
    output: Mutex<OutputState>,
    /// Producer wrote the input ring (worker waits for this).
    read_progressed: Condvar,
    /// Worker drained the input ring (producer waits for this).
    input_progressed: Condvar,
    /// Worker wrote the output ring (consumer waits for this).
    output_arrived: Condvar,
    /// Consumer drained the output ring (worker waits for this).
    output_progressed: Condvar,
    stop: AtomicBool,
}

impl Shared {
    fn latch_error(&self, err: Error) {
        let mut out = self.output.lock();
        if out.error.is_none() {
            out.error = Some(err);
        }
        self.output_arrived.notify_all();
    }
}

/// A [`Read`] of denoised PCM bytes, produced by background threads.
///
/// Dropping the stream stops both threads; bytes still in flight are lost.
pub struct SuppressionStream {
    shared: Arc<Shared>,
    producer: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SuppressionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuppressionStream").finish_non_exhaustive()
    }
}

impl SuppressionStream {
    /// Start suppressing `inner` through `suppressor`.
    ///
    /// `input_capacity` and `output_capacity` size the two rings in bytes;
    /// each must hold at least one suppressor chunk.
    pub fn new(
        inner: impl Read + Send + 'static,
        suppressor: Box<dyn FrameSuppressor + Send>,
        input_capacity: usize,
        output_capacity: usize,
    ) -> crate::Result<Self> {
        let chunk_size = suppressor.chunk_size();
        let (pcm, _rate) = suppressor.encoding();
        let frame_bytes = pcm.bytes_per_sample() * suppressor.channels() as usize;
        if chunk_size == 0 || chunk_size % frame_bytes != 0 {
            return Err(Error::NotChunkAligned {
                got: chunk_size,
                chunk: frame_bytes,
            });
        }
        for capacity in [input_capacity, output_capacity] {
            if capacity < chunk_size {
                return Err(Error::CapacityTooSmall {
                    capacity,
                    chunk: chunk_size,
                });
            }
        }

        let shared = Arc::new(Shared {
            input: Mutex::new(InputState {
                ring: RingBuffer::new(input_capacity),
                done: false,
            }),
            output: Mutex::new(OutputState {
                ring: RingBuffer::new(output_capacity),
                done: false,
                error: None,
            }),
            read_progressed: Condvar::new(),
            input_progressed: Condvar::new(),
            output_arrived: Condvar::new(),
            output_progressed: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let producer = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("attune-denoise-producer".into())
                .spawn(move || producer_loop(shared, inner, frame_bytes, input_capacity))
                .expect("failed to spawn producer thread")
        };
        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("attune-denoise-worker".into())
                .spawn(move || worker_loop(shared, suppressor, chunk_size))
                .expect("failed to spawn worker thread")
        };

        Ok(Self {
            shared,
            producer: Some(producer),
            worker: Some(worker),
        })
    }
}

impl Read for SuppressionStream {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        if p.is_empty() {
            return Ok(0);
        }

        let mut out = self.shared.output.lock();
        loop {
            let n = out.ring.read(p);
            if n > 0 {
                self.shared.output_progressed.notify_all();
                return Ok(n);
            }
            if let Some(err) = &out.error {
                return Err(match err {
                    Error::Upstream(inner) => io::Error::new(inner.kind(), err.to_string()),
                    other => io::Error::other(other.to_string()),
                });
            }
            if out.done {
                return Ok(0);
            }
            if self.shared.stop.load(Ordering::Acquire) {
                return Err(io::Error::other(Error::Cancelled.to_string()));
            }
            self.shared.output_arrived.wait(&mut out);
        }
    }
}

impl Drop for SuppressionStream {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        // Notify under each ring's lock so a thread between its stop check
        // and its park cannot miss the wake.
        {
            let _input = self.shared.input.lock();
            self.shared.read_progressed.notify_all();
            self.shared.input_progressed.notify_all();
        }
        {
            let _output = self.shared.output.lock();
            self.shared.output_arrived.notify_all();
            self.shared.output_progressed.notify_all();
        }

        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// Read the inner stream into the input ring until EOF, error, or stop.
fn producer_loop(
    shared: Arc<Shared>,
    mut inner: impl Read,
    frame_bytes: usize,
    input_capacity: usize,
) {
    let mut scratch = vec![0u8; READ_SCRATCH_SIZE.min(input_capacity)];

    loop {
        if shared.stop.load(Ordering::Acquire) {
            return;
        }

        let n = match inner.read(&mut scratch) {
            Ok(0) => {
                finish_input(&shared);
                return;
            }
            Ok(n) => n,
            Err(err) => {
                shared.latch_error(Error::Upstream(err));
                finish_input(&shared);
                return;
            }
        };
        if n % frame_bytes != 0 {
            shared.latch_error(Error::Misaligned {
                got: n,
                multiple_of: frame_bytes,
            });
            finish_input(&shared);
            return;
        }

        let mut input = shared.input.lock();
        let mut written = 0;
        while written < n {
            if shared.stop.load(Ordering::Acquire) {
                return;
            }
            let w = input.ring.write(&scratch[written..n]);
            if w > 0 {
                written += w;
                shared.read_progressed.notify_all();
            } else {
                shared.input_progressed.wait(&mut input);
            }
        }
    }
}

fn finish_input(shared: &Shared) {
    shared.input.lock().done = true;
    shared.read_progressed.notify_all();
}

/// Assemble chunks from the input ring, suppress them, and push the result
/// into the output ring.
fn worker_loop(
    shared: Arc<Shared>,
    mut suppressor: Box<dyn FrameSuppressor + Send>,
    chunk_size: usize,
) {
    let mut frame_in = vec![0u8; chunk_size];
    let mut frame_out = vec![0u8; chunk_size];

    loop {
        // Coalesce one whole chunk; partial ring reads are expected.
        {
            let mut input = shared.input.lock();
            let mut received = 0;
            loop {
                if shared.stop.load(Ordering::Acquire) {
                    return;
                }
                let n = input.ring.read(&mut frame_in[received..]);
                if n > 0 {
                    received += n;
                    shared.input_progressed.notify_all();
                }
                if received == chunk_size {
                    break;
                }
                if input.done && input.ring.is_empty() {
                    // No further whole chunk can ever form; a partial tail
                    // is dropped here.
                    drop(input);
                    finish_output(&shared);
                    return;
                }
                shared.read_progressed.wait(&mut input);
            }
        }

        let _vad = match suppressor.suppress(&frame_in, &mut frame_out) {
            Ok(vad) => vad,
            Err(err) => {
                shared.latch_error(err);
                finish_output(&shared);
                return;
            }
        };

        let mut output = shared.output.lock();
        let mut written = 0;
        while written < chunk_size {
            if shared.stop.load(Ordering::Acquire) {
                return;
            }
            let w = output.ring.write(&frame_out[written..]);
            if w > 0 {
                written += w;
                shared.output_arrived.notify_all();
            } else {
                shared.output_progressed.wait(&mut output);
            }
        }
    }
}

fn finish_output(shared: &Shared) {
    let mut output = shared.output.lock();
    output.done = true;
    shared.output_arrived.notify_all();
}
