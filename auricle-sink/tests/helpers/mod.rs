//! Test helper modules for audio pipeline integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockSink: recording output device with injectable faults
//! - PCM generation and polling utilities

pub mod mock_sink;
pub mod pcm;

pub use mock_sink::{MockSink, SinkCall, SinkProbe};
pub use pcm::{pcm_ramp, wait_until};
