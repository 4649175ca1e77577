//! # Auricle Audio Sink Library (auricle-sink)
//!
//! Audio delivery core for a Bluetooth-style audio sink device.
//!
//! **Purpose:** Stage incoming PCM bursts in a bounded buffer, scale
//! them by the remote controller's volume, and feed a rate-limited
//! output device from a dedicated writer thread.
//!
//! **Architecture:** Single producer (stream callbacks) and single
//! consumer (writer thread) around a blocking ring buffer, with an
//! output device abstraction behind the `OutputSink` trait.

pub mod audio;
pub mod error;
pub mod events;
pub mod playback;

pub use error::{Error, Result};
pub use playback::engine::AudioPipeline;
