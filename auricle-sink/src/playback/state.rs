//! Playback phase tracking
//!
//! The writer thread owns all phase transitions; everyone else reads.
//! Transitions are published on the event bus so observers see the
//! Idle / Prefetching / Writing / Paused lifecycle without polling.

use auricle_common::events::{EventBus, PlaybackPhase, SinkEvent};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct PhaseTracker {
    phase: AtomicU8,
    events: Arc<EventBus>,
}

impl PhaseTracker {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            phase: AtomicU8::new(PlaybackPhase::Idle as u8),
            events,
        }
    }

    /// Current phase.
    pub fn get(&self) -> PlaybackPhase {
        // Acquire pairs with the Release in set: work the writer did
        // before a transition is visible to anyone who observes it
        PlaybackPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Record a transition and announce it if the phase changed.
    pub fn set(&self, phase: PlaybackPhase) {
        let old = PlaybackPhase::from_u8(self.phase.swap(phase as u8, Ordering::AcqRel));
        if old == phase {
            return;
        }
        debug!("Playback phase: {} -> {}", old, phase);
        self.events.emit_lossy(SinkEvent::PhaseChanged {
            old_phase: old,
            new_phase: phase,
            timestamp: chrono::Utc::now(),
        });
    }
}
