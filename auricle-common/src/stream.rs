//! Stream format vocabulary
//!
//! The profile layer decodes codec capability bytes once at its boundary and
//! hands the pipeline a validated [`StreamFormat`]. Everything downstream
//! (frame sizing, transfer chunking, the sample scaler) derives from it.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sample rates the upstream codec can deliver
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [16000, 32000, 44100, 48000];

/// Negotiated stream format for the output sink.
///
/// **Format:**
/// - Samples are interleaved signed 16-bit little-endian PCM
/// - `frame_bytes()` is one time-aligned group of per-channel samples
///   (4 bytes for 16-bit stereo, 2 bytes for 16-bit mono)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Bits per sample per channel (the upstream codec is 16-bit only)
    pub bits_per_sample: u16,

    /// Channel count (1 = mono, 2 = stereo)
    pub channel_count: u16,
}

impl StreamFormat {
    /// Create a validated stream format.
    ///
    /// Rejects rates the codec never produces, bit depths other than 16,
    /// and channel counts outside 1..=2. Rejection propagates to the
    /// profile layer as a configuration failure.
    pub fn new(sample_rate: u32, bits_per_sample: u16, channel_count: u16) -> Result<Self> {
        if !SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
            return Err(Error::InvalidInput(format!(
                "unsupported sample rate: {} Hz",
                sample_rate
            )));
        }
        if bits_per_sample != 16 {
            return Err(Error::InvalidInput(format!(
                "unsupported bit depth: {} bits per sample",
                bits_per_sample
            )));
        }
        if channel_count == 0 || channel_count > 2 {
            return Err(Error::InvalidInput(format!(
                "unsupported channel count: {}",
                channel_count
            )));
        }

        Ok(Self {
            sample_rate,
            bits_per_sample,
            channel_count,
        })
    }

    /// Bytes per channel sample (2 for 16-bit)
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    /// Bytes per frame: one interleaved sample group across all channels
    pub fn frame_bytes(&self) -> usize {
        self.bytes_per_sample() * self.channel_count as usize
    }

    /// Stream byte rate in bytes per second
    pub fn byte_rate(&self) -> usize {
        self.sample_rate as usize * self.frame_bytes()
    }
}

impl Default for StreamFormat {
    /// The format the sink is brought up with before the profile layer
    /// issues a configure call: 44100 Hz, 16-bit, stereo.
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bits_per_sample: 16,
            channel_count: 2,
        }
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz / {}-bit / {}",
            self.sample_rate,
            self.bits_per_sample,
            if self.channel_count == 1 { "mono" } else { "stereo" }
        )
    }
}
