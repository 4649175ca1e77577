//! Output device configuration and per-cycle transfer planning
//!
//! When the stream layer negotiates a new format, the device clock and
//! slot layout are retuned and the writer's per-cycle transfer size is
//! recomputed so every transfer stays frame-aligned and within the
//! device's single-transfer limit.

use crate::audio::output::OutputSink;
use crate::Result;
use auricle_common::StreamFormat;
use tracing::info;

/// Derived sizes the writer thread plans each cycle around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    /// Bytes in one complete frame (one sample per channel).
    pub frame_bytes: usize,
    /// Upper bound for one transfer: the largest multiple of
    /// `frame_bytes` that fits both the device's single-transfer limit
    /// and one incoming burst.
    pub cycle_bytes: usize,
}

impl TransferPlan {
    pub fn new(format: &StreamFormat, max_transfer_bytes: usize, burst_bytes: usize) -> Self {
        let frame_bytes = format.frame_bytes();
        let ceiling = max_transfer_bytes.min(burst_bytes);
        let cycle_bytes = (ceiling / frame_bytes) * frame_bytes;
        Self {
            frame_bytes,
            cycle_bytes,
        }
    }
}

/// Owns the output device and keeps its configuration in step with
/// the negotiated stream format.
///
/// Reconfiguration and playback are serialized by the caller; the
/// writer thread never observes a half-configured device.
pub struct OutputController {
    sink: Box<dyn OutputSink>,
    format: StreamFormat,
    plan: TransferPlan,
    burst_bytes: usize,
    enabled: bool,
}

impl OutputController {
    /// Wrap an output device. The device starts disabled; call
    /// `configure` to bring it up.
    pub fn new(sink: Box<dyn OutputSink>, burst_bytes: usize) -> Self {
        let format = StreamFormat::default();
        let plan = TransferPlan::new(&format, sink.max_transfer_bytes(), burst_bytes);
        Self {
            sink,
            format,
            plan,
            burst_bytes,
            enabled: false,
        }
    }

    /// Retune the device for a new stream format.
    ///
    /// Sequence: disable, reconfigure clock, reconfigure slots, enable.
    /// A failure partway through leaves the device disabled and the
    /// error propagates to the caller.
    pub fn configure(&mut self, format: StreamFormat) -> Result<()> {
        if self.enabled {
            self.sink.disable()?;
            self.enabled = false;
        }
        self.sink.reconfigure_clock(format.sample_rate)?;
        self.sink
            .reconfigure_slot(format.bits_per_sample, format.channel_count)?;
        self.sink.enable()?;
        self.enabled = true;

        self.format = format;
        self.plan = TransferPlan::new(&format, self.sink.max_transfer_bytes(), self.burst_bytes);
        info!(
            "Output configured: {} ({} bytes/cycle)",
            format, self.plan.cycle_bytes
        );
        Ok(())
    }

    /// Push PCM bytes to the device.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.sink.write(data)
    }

    /// Disable the device if it is running.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.enabled {
            self.sink.disable()?;
            self.enabled = false;
        }
        Ok(())
    }

    pub fn plan(&self) -> TransferPlan {
        self.plan
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
