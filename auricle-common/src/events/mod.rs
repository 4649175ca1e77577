//! Event types for the Auricle event system
//!
//! Provides the shared event definitions and the EventBus used to observe
//! the audio pipeline without coupling to it.

mod types;

pub use types::{PlaybackPhase, TransportState};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline event types
///
/// Events are broadcast via [`EventBus`]. Emission from audio-path code is
/// lossy by design: a cycle never blocks or fails because nobody is
/// listening.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SinkEvent {
    /// A stream session was armed (device connected)
    PipelineArmed {
        /// Identifier for this session, carried in logs and later events
        session_id: Uuid,
        /// Ring buffer capacity in bytes for this session
        capacity: usize,
        /// Prefetch threshold in bytes for this session
        prefetch_threshold: usize,
        /// When the session was armed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The stream session was torn down (device disconnected)
    PipelineTornDown {
        /// Session that ended
        session_id: Uuid,
        /// When teardown completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Consumer task phase changed
    PhaseChanged {
        /// Phase before the transition
        old_phase: PlaybackPhase,
        /// Phase after the transition
        new_phase: PlaybackPhase,
        /// When the phase changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Upstream profile signalled a transport state change
    TransportChanged {
        /// The signalled state (latest wins)
        state: TransportState,
        /// When the signal arrived
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Output format was reconfigured
    FormatChanged {
        /// Sample rate in Hz
        sample_rate: u32,
        /// Bits per sample per channel
        bits_per_sample: u16,
        /// Channel count
        channel_count: u16,
        /// Recomputed frame size in bytes
        frame_bytes: usize,
        /// Recomputed per-cycle transfer chunk in bytes
        cycle_bytes: usize,
        /// When the reconfiguration completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume level changed via the remote-control path
    VolumeChanged {
        /// Raw device-protocol volume (0-127)
        raw: u8,
        /// Derived percentage (0-100)
        percent: u8,
        /// When volume changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A producer batch was dropped (buffer full past the bounded wait)
    DataDropped {
        /// Bytes in the rejected batch
        bytes: usize,
        /// Cumulative dropped bytes for the session
        total_dropped: u64,
        /// When the drop happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The output sink failed several consecutive writes
    SinkStalled {
        /// Consecutive failed write cycles
        consecutive_failures: u32,
        /// When the stall threshold was crossed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for [`SinkEvent`]
///
/// Thin wrapper around `tokio::sync::broadcast`: subscribers receive every
/// event emitted after they subscribe, and slow subscribers lag rather than
/// back-pressure the pipeline.
pub struct EventBus {
    tx: broadcast::Sender<SinkEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SinkEvent,
    ) -> Result<usize, broadcast::error::SendError<SinkEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether any subscriber is listening
    ///
    /// Used from audio-path code where delivery is best-effort.
    pub fn emit_lossy(&self, event: SinkEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
