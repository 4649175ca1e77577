//! Supporting type definitions for pipeline events

use serde::{Deserialize, Serialize};

/// Transport state signalled by the upstream profile layer.
///
/// Carried through the notification channel with overwrite semantics:
/// only the most recent value matters to the consumer task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// Remote stream is delivering audio
    Active,
    /// Remote stream paused or stopped delivering
    Suspended,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Active => write!(f, "active"),
            TransportState::Suspended => write!(f, "suspended"),
        }
    }
}

/// Consumer task phase.
///
/// Mutated exclusively by the consumer task; everyone else observes.
/// Writing is only entered from Prefetching once the buffered byte count
/// reaches the prefetch threshold, and Paused is only settled after the
/// ring buffer has been drained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
#[repr(u8)]
pub enum PlaybackPhase {
    /// No session running, or waiting for the first activity signal
    Idle = 0,
    /// Accumulating buffered audio before output starts
    Prefetching = 1,
    /// Steady-state read → scale → write cycles
    Writing = 2,
    /// Drained after a suspend signal, waiting for reactivation
    Paused = 3,
}

impl PlaybackPhase {
    /// Recover a phase from its wire/atomic representation
    pub fn from_u8(value: u8) -> PlaybackPhase {
        match value {
            1 => PlaybackPhase::Prefetching,
            2 => PlaybackPhase::Writing,
            3 => PlaybackPhase::Paused,
            _ => PlaybackPhase::Idle,
        }
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "Idle"),
            PlaybackPhase::Prefetching => write!(f, "Prefetching"),
            PlaybackPhase::Writing => write!(f, "Writing"),
            PlaybackPhase::Paused => write!(f, "Paused"),
        }
    }
}
