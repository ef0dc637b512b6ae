//! PCM format description.

use std::time::Duration;

/// Lowest sample rate accepted from uploads.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest sample rate accepted from uploads.
///
/// Resampler setup cost grows with the rate, so header values are capped.
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Returns true if `rate` lies in `MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE`.
pub fn is_supported_rate(rate: u32) -> bool {
    (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate)
}

/// Describes 16-bit PCM audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Sample rate in Hz (e.g., 16000, 44100).
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl Format {
    /// Creates a mono format.
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }

    /// Bytes per second of 16-bit audio in this format.
    pub fn bytes_rate(&self) -> usize {
        self.sample_rate as usize * self.channels as usize * 2
    }

    /// Duration of `bytes` bytes of 16-bit audio in this format.
    pub fn duration(&self, bytes: usize) -> Duration {
        let rate = self.bytes_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((bytes as u64).saturating_mul(1_000_000_000) / rate as u64)
    }
}

impl Format {
    /// 16kHz mono, the format both remote engines expect.
    pub const MONO_16K: Format = Format::mono(16000);
}
