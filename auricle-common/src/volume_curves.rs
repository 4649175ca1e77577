//! Volume curve implementations for remote volume control
//!
//! Maps the 0-127 volume steps reported by a remote controller onto
//! a linear scale factor applied to PCM samples.

use serde::{Deserialize, Serialize};

/// Highest volume step a remote controller can report.
pub const MAX_RAW_VOLUME: u8 = 127;

/// Convert a raw 0-127 volume step to an integer percentage (0-100).
///
/// Integer math truncates, so the mapping is not exactly invertible:
/// `percent_to_raw(raw_to_percent(r))` may differ from `r` by one step.
pub fn raw_to_percent(raw: u8) -> u8 {
    let raw = raw.min(MAX_RAW_VOLUME);
    ((raw as u32 * 100) / MAX_RAW_VOLUME as u32) as u8
}

/// Convert an integer percentage (0-100) to a raw 0-127 volume step.
pub fn percent_to_raw(percent: u8) -> u8 {
    let percent = percent.min(100);
    ((percent as u32 * MAX_RAW_VOLUME as u32) / 100) as u8
}

/// Volume curve types for scale factor computation
///
/// Each curve maps the full 0-127 step range differently:
/// - Linear: even steps, tops out above unity for extra headroom
/// - Exponential: perceptually even steps, tops out at unity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeCurve {
    /// Linear: f(v) = 2.1 × v / 127
    ///
    /// Reaches 2.1 at full volume; samples scaled past full scale are
    /// saturated rather than wrapped.
    Linear,

    /// Exponential: f(v) = 2^(v/127) - 1
    ///
    /// Matches perceived loudness more closely and reaches exactly 1.0
    /// at full volume.
    Exponential,
}

impl VolumeCurve {
    /// Calculate the scale factor for a raw volume step
    ///
    /// # Arguments
    /// * `raw` - Volume step (0-127, higher values are clamped)
    ///
    /// # Returns
    /// Multiplier to apply to each sample (0.0 = silence)
    pub fn factor_for(&self, raw: u8) -> f32 {
        let v = raw.min(MAX_RAW_VOLUME) as f32;

        match self {
            VolumeCurve::Linear => 2.1 * v / MAX_RAW_VOLUME as f32,
            VolumeCurve::Exponential => 2f32.powf(v / MAX_RAW_VOLUME as f32) - 1.0,
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            VolumeCurve::Linear => "Linear",
            VolumeCurve::Exponential => "Exponential",
        }
    }

    /// Get all available volume curve variants
    pub fn all_variants() -> &'static [VolumeCurve] {
        &[VolumeCurve::Linear, VolumeCurve::Exponential]
    }
}

impl Default for VolumeCurve {
    /// Default volume curve is Exponential (perceptually even steps)
    fn default() -> Self {
        VolumeCurve::Exponential
    }
}

impl std::fmt::Display for VolumeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
