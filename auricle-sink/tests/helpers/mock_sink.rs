//! Recording output sink for integration tests
//!
//! [`MockSink`] implements the output device trait and records every
//! call it receives. The paired [`SinkProbe`] stays with the test and
//! can inspect the call log and captured audio, or inject faults, while
//! the sink itself lives inside the pipeline.

use auricle_sink::audio::OutputSink;
use auricle_sink::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Enable,
    Disable,
    Clock {
        sample_rate: u32,
    },
    Slot {
        bits_per_sample: u16,
        channel_count: u16,
    },
    Write {
        bytes: usize,
    },
}

/// Shared view into everything a [`MockSink`] observed.
#[derive(Clone, Default)]
pub struct SinkProbe {
    calls: Arc<Mutex<Vec<SinkCall>>>,
    data: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
    write_delay: Arc<Mutex<Duration>>,
}

impl SinkProbe {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Every byte the device accepted, in write order.
    pub fn data(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    pub fn write_sizes(&self) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Write { bytes } => Some(*bytes),
                _ => None,
            })
            .collect()
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Slow the device down so tests can catch the buffer non-empty.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = delay;
    }
}

/// Output sink that records calls and captures written bytes.
pub struct MockSink {
    probe: SinkProbe,
    max_transfer_bytes: usize,
}

impl MockSink {
    pub fn new(max_transfer_bytes: usize) -> (Self, SinkProbe) {
        let probe = SinkProbe::default();
        (
            Self {
                probe: probe.clone(),
                max_transfer_bytes,
            },
            probe,
        )
    }
}

impl OutputSink for MockSink {
    fn enable(&mut self) -> Result<()> {
        self.probe.calls.lock().unwrap().push(SinkCall::Enable);
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.probe.calls.lock().unwrap().push(SinkCall::Disable);
        Ok(())
    }

    fn reconfigure_clock(&mut self, sample_rate: u32) -> Result<()> {
        self.probe
            .calls
            .lock()
            .unwrap()
            .push(SinkCall::Clock { sample_rate });
        Ok(())
    }

    fn reconfigure_slot(&mut self, bits_per_sample: u16, channel_count: u16) -> Result<()> {
        self.probe.calls.lock().unwrap().push(SinkCall::Slot {
            bits_per_sample,
            channel_count,
        });
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let delay = *self.probe.write_delay.lock().unwrap();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if self.probe.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::Output("injected write failure".to_string()));
        }
        self.probe
            .calls
            .lock()
            .unwrap()
            .push(SinkCall::Write { bytes: data.len() });
        self.probe.data.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn max_transfer_bytes(&self) -> usize {
        self.max_transfer_bytes
    }
}
