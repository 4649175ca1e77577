//! Event system for the Auricle audio sink
//!
//! Playback communication is hybrid:
//! - **EventBus** (tokio::broadcast): one-to-many notifications at the
//!   module boundary
//! - **StateNotifier** (single slot + condvar): transport commands from
//!   stream callbacks to the writer thread
//!
//! This module re-exports the shared event types from auricle-common.

pub use auricle_common::events::{EventBus, PlaybackPhase, SinkEvent, TransportState};
