//! Output device abstraction
//!
//! The writer thread feeds whatever implements `OutputSink`. On the
//! target device this is a DMA-backed I2S peripheral; for development
//! and tests the same interface is served by a discarding sink or a
//! WAV capture sink.

use crate::{Error, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// A rate-limited PCM output device.
///
/// Reconfiguration is only legal while the device is disabled; the
/// `OutputController` sequences the disable / reconfigure / enable
/// calls. `write` blocks until the device accepts data or gives up,
/// and returns the number of bytes accepted.
pub trait OutputSink: Send {
    /// Start accepting writes.
    fn enable(&mut self) -> Result<()>;

    /// Stop accepting writes.
    fn disable(&mut self) -> Result<()>;

    /// Retune the device clock for a new sample rate.
    fn reconfigure_clock(&mut self, sample_rate: u32) -> Result<()>;

    /// Reshape the device slots for a new sample width and channel count.
    fn reconfigure_slot(&mut self, bits_per_sample: u16, channel_count: u16) -> Result<()>;

    /// Push PCM bytes to the device, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Largest single transfer the device accepts, in bytes.
    fn max_transfer_bytes(&self) -> usize;
}

/// Discarding sink for development and tests.
///
/// Optionally sleeps at the configured stream byte rate so the writer
/// thread experiences realistic device backpressure.
#[derive(Debug)]
pub struct NullSink {
    enabled: bool,
    paced: bool,
    sample_rate: u32,
    bits_per_sample: u16,
    channel_count: u16,
    max_transfer_bytes: usize,
    bytes_discarded: u64,
}

impl NullSink {
    pub fn new(max_transfer_bytes: usize, paced: bool) -> Self {
        Self {
            enabled: false,
            paced,
            sample_rate: 44100,
            bits_per_sample: 16,
            channel_count: 2,
            max_transfer_bytes,
            bytes_discarded: 0,
        }
    }

    /// Total bytes accepted and thrown away.
    pub fn bytes_discarded(&self) -> u64 {
        self.bytes_discarded
    }

    fn byte_rate(&self) -> u64 {
        self.sample_rate as u64 * (self.bits_per_sample as u64 / 8) * self.channel_count as u64
    }
}

impl OutputSink for NullSink {
    fn enable(&mut self) -> Result<()> {
        if self.enabled {
            return Err(Error::InvalidState("output already enabled".to_string()));
        }
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        if !self.enabled {
            return Err(Error::InvalidState("output not enabled".to_string()));
        }
        self.enabled = false;
        Ok(())
    }

    fn reconfigure_clock(&mut self, sample_rate: u32) -> Result<()> {
        if self.enabled {
            return Err(Error::InvalidState(
                "cannot reconfigure clock while enabled".to_string(),
            ));
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    fn reconfigure_slot(&mut self, bits_per_sample: u16, channel_count: u16) -> Result<()> {
        if self.enabled {
            return Err(Error::InvalidState(
                "cannot reconfigure slot while enabled".to_string(),
            ));
        }
        self.bits_per_sample = bits_per_sample;
        self.channel_count = channel_count;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.enabled {
            return Err(Error::Output("write on disabled output".to_string()));
        }
        if self.paced {
            let rate = self.byte_rate();
            if rate > 0 {
                std::thread::sleep(Duration::from_secs_f64(data.len() as f64 / rate as f64));
            }
        }
        self.bytes_discarded += data.len() as u64;
        Ok(data.len())
    }

    fn max_transfer_bytes(&self) -> usize {
        self.max_transfer_bytes
    }
}

/// WAV capture sink backed by the hound crate.
///
/// Each enable starts a fresh capture file at the same path, using the
/// most recently configured clock and slot settings. Only 16-bit
/// samples are supported.
pub struct WavSink {
    path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    bits_per_sample: u16,
    channel_count: u16,
    max_transfer_bytes: usize,
}

impl WavSink {
    pub fn new(path: impl AsRef<Path>, max_transfer_bytes: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
            sample_rate: 44100,
            bits_per_sample: 16,
            channel_count: 2,
            max_transfer_bytes,
        }
    }
}

impl OutputSink for WavSink {
    fn enable(&mut self) -> Result<()> {
        if self.writer.is_some() {
            return Err(Error::InvalidState("output already enabled".to_string()));
        }
        let spec = hound::WavSpec {
            channels: self.channel_count,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&self.path, spec)
            .map_err(|e| Error::Output(format!("wav create: {}", e)))?;
        self.writer = Some(writer);
        debug!("WAV capture started: {}", self.path.display());
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| Error::InvalidState("output not enabled".to_string()))?;
        writer
            .finalize()
            .map_err(|e| Error::Output(format!("wav finalize: {}", e)))?;
        debug!("WAV capture finalized: {}", self.path.display());
        Ok(())
    }

    fn reconfigure_clock(&mut self, sample_rate: u32) -> Result<()> {
        if self.writer.is_some() {
            return Err(Error::InvalidState(
                "cannot reconfigure clock while enabled".to_string(),
            ));
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    fn reconfigure_slot(&mut self, bits_per_sample: u16, channel_count: u16) -> Result<()> {
        if self.writer.is_some() {
            return Err(Error::InvalidState(
                "cannot reconfigure slot while enabled".to_string(),
            ));
        }
        if bits_per_sample != 16 {
            return Err(Error::UnsupportedFormat(format!(
                "WAV capture supports 16-bit samples, got {}",
                bits_per_sample
            )));
        }
        self.bits_per_sample = bits_per_sample;
        self.channel_count = channel_count;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Output("write on disabled output".to_string()))?;
        let mut accepted = 0;
        for sample in data.chunks_exact(2) {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            writer
                .write_sample(value)
                .map_err(|e| Error::Output(format!("wav write: {}", e)))?;
            accepted += 2;
        }
        Ok(accepted)
    }

    fn max_transfer_bytes(&self) -> usize {
        self.max_transfer_bytes
    }
}
