//! PCM sample encodings and stream formats.

use std::fmt;
use std::time::Duration;

/// Sample encoding of a raw PCM byte stream.
///
/// Each variant fixes the integer/float representation, the byte width, and
/// the endianness of a single channel value. Samples decode to a real value
/// in `[-1, 1]`: unsigned 8-bit is centered at 128, signed integers are
/// divided by `2^(bits-1)`, and floats are read bitwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PcmFormat {
    #[default]
    Undefined,
    U8,
    S16Le,
    S16Be,
    F32Le,
    F32Be,
    S24Le,
    S24Be,
    S32Le,
    S32Be,
    F64Le,
    F64Be,
    S64Le,
    S64Be,
}

impl PcmFormat {
    /// All defined encodings, in declaration order.
    pub const ALL: [PcmFormat; 13] = [
        PcmFormat::U8,
        PcmFormat::S16Le,
        PcmFormat::S16Be,
        PcmFormat::F32Le,
        PcmFormat::F32Be,
        PcmFormat::S24Le,
        PcmFormat::S24Be,
        PcmFormat::S32Le,
        PcmFormat::S32Be,
        PcmFormat::F64Le,
        PcmFormat::F64Be,
        PcmFormat::S64Le,
        PcmFormat::S64Be,
    ];

    /// Width of one encoded sample in bytes.
    ///
    /// [`PcmFormat::Undefined`] has no width and returns a `usize::MAX`
    /// sentinel, so that any size arithmetic on it fails loudly instead of
    /// silently producing a zero-sized stream.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PcmFormat::Undefined => usize::MAX,
            PcmFormat::U8 => 1,
            PcmFormat::S16Le | PcmFormat::S16Be => 2,
            PcmFormat::S24Le | PcmFormat::S24Be => 3,
            PcmFormat::F32Le | PcmFormat::F32Be | PcmFormat::S32Le | PcmFormat::S32Be => 4,
            PcmFormat::F64Le | PcmFormat::F64Be | PcmFormat::S64Le | PcmFormat::S64Be => 8,
        }
    }

    /// Parse a conventional short name (`"s16le"`, `"f32le"`, …),
    /// case-insensitively. Unknown names map to [`PcmFormat::Undefined`].
    pub fn from_name(name: &str) -> PcmFormat {
        let name = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.to_string() == name)
            .unwrap_or(PcmFormat::Undefined)
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PcmFormat::Undefined => "<undefined>",
            PcmFormat::U8 => "u8",
            PcmFormat::S16Le => "s16le",
            PcmFormat::S16Be => "s16be",
            PcmFormat::F32Le => "f32le",
            PcmFormat::F32Be => "f32be",
            PcmFormat::S24Le => "s24le",
            PcmFormat::S24Be => "s24be",
            PcmFormat::S32Le => "s32le",
            PcmFormat::S32Be => "s32be",
            PcmFormat::F64Le => "f64le",
            PcmFormat::F64Be => "f64be",
            PcmFormat::S64Le => "s64le",
            PcmFormat::S64Be => "s64be",
        };
        f.write_str(name)
    }
}

/// Full format of an interleaved PCM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Per-sample encoding.
    pub pcm: PcmFormat,
}

impl Format {
    pub fn new(channels: u32, sample_rate: u32, pcm: PcmFormat) -> Self {
        Self {
            channels,
            sample_rate,
            pcm,
        }
    }

    /// Bytes occupied by one sample of one channel.
    pub fn bytes_per_sample(&self) -> usize {
        self.pcm.bytes_per_sample()
    }

    /// Bytes occupied by one time instant across all channels.
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// Bytes occupied by one second of audio.
    pub fn bytes_per_second(&self) -> usize {
        self.bytes_per_frame() * self.sample_rate as usize
    }

    /// Bytes occupied by `d` of audio, truncated to whole samples.
    pub fn bytes_for_duration(&self, d: Duration) -> u64 {
        let samples = self.sample_rate as u64 * d.as_micros() as u64 / 1_000_000;
        samples * self.bytes_per_frame() as u64
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ch {}Hz {}", self.channels, self.sample_rate, self.pcm)
    }
}
