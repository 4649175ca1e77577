//! Configuration loading and resolution
//!
//! The sink configuration resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `AURICLE_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/auricle/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing platform config file is not an error; the compiled
//! defaults apply. A file that was explicitly requested, or that
//! exists but fails to parse or validate, is an error.

use crate::volume_curves::VolumeCurve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "AURICLE_CONFIG";

/// Top-level sink configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SinkConfig {
    pub volume: VolumeConfig,
    pub buffer: BufferConfig,
    pub output: OutputConfig,
}

/// Startup volume settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Initial volume as a percentage (0-100).
    pub default_percent: u8,
    /// Curve mapping remote volume steps to a scale factor.
    pub curve: VolumeCurve,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            default_percent: 30,
            curve: VolumeCurve::default(),
        }
    }
}

/// Staging buffer geometry and blocking behavior.
///
/// Sizes are expressed in bursts, the fixed-size batches the stream
/// layer delivers, so capacity and prefetch threshold scale together
/// when the burst size changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Size of one incoming audio burst in bytes.
    pub burst_bytes: usize,
    /// Buffer capacity as a multiple of `burst_bytes`.
    pub capacity_bursts: usize,
    /// Occupancy threshold, in bursts, before playback starts.
    pub prefetch_bursts: usize,
    /// Longest a producer write waits for free space, in milliseconds.
    pub write_timeout_ms: u64,
    /// Longest a consumer read waits for data, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            burst_bytes: 4096,
            capacity_bursts: 8,
            prefetch_bursts: 2,
            write_timeout_ms: 10,
            read_timeout_ms: 10,
        }
    }
}

impl BufferConfig {
    /// Total buffer capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.burst_bytes * self.capacity_bursts
    }

    /// Occupancy, in bytes, at which playback leaves the prefetch phase.
    pub fn prefetch_bytes(&self) -> usize {
        self.burst_bytes * self.prefetch_bursts
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Output device limits and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Largest single transfer the output device accepts, in bytes.
    pub max_transfer_bytes: usize,
    /// Whether a simulated output sleeps at the stream byte rate.
    pub paced: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_transfer_bytes: 4092,
            paced: true,
        }
    }
}

impl SinkConfig {
    /// Load configuration following the resolution priority order.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_path {
            debug!("Loading config from command-line path: {}", path.display());
            return Self::load_from_path(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            debug!("Loading config from {}: {}", CONFIG_ENV_VAR, path);
            return Self::load_from_path(Path::new(&path));
        }

        // Priority 3: Platform config directory
        if let Some(path) = default_config_path() {
            if path.exists() {
                debug!("Loading config from platform path: {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        // Priority 4: Compiled defaults
        debug!("No config file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Load and validate configuration from an explicit file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: SinkConfig = toml::from_str(&text).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.volume.default_percent > 100 {
            return Err(Error::Config(format!(
                "volume.default_percent must be 0-100, got {}",
                self.volume.default_percent
            )));
        }
        if self.buffer.burst_bytes == 0 {
            return Err(Error::Config(
                "buffer.burst_bytes must be non-zero".to_string(),
            ));
        }
        // One 16-bit stereo frame is 4 bytes, the widest frame supported.
        if self.buffer.burst_bytes % 4 != 0 {
            return Err(Error::Config(format!(
                "buffer.burst_bytes must be a multiple of 4, got {}",
                self.buffer.burst_bytes
            )));
        }
        if self.buffer.capacity_bursts == 0 {
            return Err(Error::Config(
                "buffer.capacity_bursts must be non-zero".to_string(),
            ));
        }
        if self.buffer.prefetch_bursts == 0
            || self.buffer.prefetch_bursts > self.buffer.capacity_bursts
        {
            return Err(Error::Config(format!(
                "buffer.prefetch_bursts must be between 1 and capacity_bursts ({}), got {}",
                self.buffer.capacity_bursts, self.buffer.prefetch_bursts
            )));
        }
        if self.buffer.write_timeout_ms == 0 {
            return Err(Error::Config(
                "buffer.write_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.buffer.read_timeout_ms == 0 {
            return Err(Error::Config(
                "buffer.read_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.output.max_transfer_bytes < 4 {
            return Err(Error::Config(format!(
                "output.max_transfer_bytes must hold at least one frame, got {}",
                self.output.max_transfer_bytes
            )));
        }
        Ok(())
    }
}

/// Platform config file location (`<config_dir>/auricle/config.toml`).
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("auricle").join("config.toml"))
}
