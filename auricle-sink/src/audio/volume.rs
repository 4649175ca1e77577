//! Master volume state shared between the control surface and the
//! writer thread
//!
//! The remote controller reports absolute volume as a 0-127 step. The
//! raw step, the derived percentage, and the scale factor are updated
//! together under one lock so a reader never observes a torn pair.

use auricle_common::volume_curves::{percent_to_raw, raw_to_percent, VolumeCurve, MAX_RAW_VOLUME};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct VolumeLevels {
    raw: u8,
    percent: u8,
    factor: f32,
}

/// Shared volume state.
///
/// Cheap to read from the audio path: `scale_factor` takes the lock
/// once and copies out an `f32`.
#[derive(Debug)]
pub struct VolumeControl {
    curve: VolumeCurve,
    levels: Mutex<VolumeLevels>,
}

impl VolumeControl {
    /// Create volume state from a startup percentage (0-100).
    pub fn new(curve: VolumeCurve, initial_percent: u8) -> Self {
        let raw = percent_to_raw(initial_percent);
        Self {
            curve,
            levels: Mutex::new(VolumeLevels {
                raw,
                percent: raw_to_percent(raw),
                factor: curve.factor_for(raw),
            }),
        }
    }

    /// Apply a volume step reported by the remote controller.
    ///
    /// Steps above 127 are clamped. Returns the accepted step and the
    /// derived percentage, both computed under the same lock that the
    /// audio path reads the scale factor from.
    pub fn set_raw(&self, raw: u8) -> (u8, u8) {
        let raw = raw.min(MAX_RAW_VOLUME);
        let percent = raw_to_percent(raw);
        let mut levels = self.levels.lock().unwrap();
        levels.raw = raw;
        levels.percent = percent;
        levels.factor = self.curve.factor_for(raw);
        (raw, percent)
    }

    /// Current raw volume step (0-127).
    pub fn raw(&self) -> u8 {
        self.levels.lock().unwrap().raw
    }

    /// Current volume as a percentage (0-100).
    pub fn percent(&self) -> u8 {
        self.levels.lock().unwrap().percent
    }

    /// Current sample scale factor.
    pub fn scale_factor(&self) -> f32 {
        self.levels.lock().unwrap().factor
    }

    pub fn curve(&self) -> VolumeCurve {
        self.curve
    }
}
