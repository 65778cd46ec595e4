//! Configuration loading and validation.

use crate::audio::frame::Source;
use crate::defaults;
use crate::engine::arbiter::ArbiterConfig;
use crate::engine::controller::PipelineConfig;
use crate::engine::segmenter::SegmenterConfig;
use crate::error::{CrosstalkError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
#[cfg(feature = "cli")]
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub arbitration: ArbitrationConfig,
    pub segmentation: SegmentationConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Microphone device name; None selects the best default input.
    pub local_device: Option<String>,
    /// System-audio device name; None auto-detects a monitor source.
    pub ambient_device: Option<String>,
    pub sample_rate: u32,
}

/// Speaker arbitration configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// RMS level above which a source counts as speaking.
    pub energy_threshold: f32,
    /// Minimum interval between active-source switches.
    pub hold_ms: u64,
    /// Winner when both sources speak at once ("local" or "ambient").
    pub overlap_winner: Source,
}

/// Utterance segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    pub silence_timeout_ms: u64,
    pub max_utterance_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            local_device: None,
            ambient_device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            energy_threshold: defaults::ENERGY_THRESHOLD,
            hold_ms: defaults::HOLD_MS,
            overlap_winner: Source::Ambient,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            silence_timeout_ms: defaults::SILENCE_TIMEOUT_MS,
            max_utterance_ms: defaults::MAX_UTTERANCE_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CrosstalkError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                CrosstalkError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't
    /// exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML or invalid
    /// values are reported as errors.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(CrosstalkError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CrosstalkError::Other(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CROSSTALK_LOCAL_DEVICE → audio.local_device
    /// - CROSSTALK_AMBIENT_DEVICE → audio.ambient_device
    /// - CROSSTALK_ENERGY_THRESHOLD → arbitration.energy_threshold
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("CROSSTALK_LOCAL_DEVICE")
            && !device.is_empty()
        {
            self.audio.local_device = Some(device);
        }

        if let Ok(device) = std::env::var("CROSSTALK_AMBIENT_DEVICE")
            && !device.is_empty()
        {
            self.audio.ambient_device = Some(device);
        }

        if let Ok(threshold) = std::env::var("CROSSTALK_ENERGY_THRESHOLD")
            && !threshold.is_empty()
        {
            match threshold.parse::<f32>() {
                Ok(value) => self.arbitration.energy_threshold = value,
                Err(_) => eprintln!(
                    "crosstalk: ignoring unparseable CROSSTALK_ENERGY_THRESHOLD={}",
                    threshold
                ),
            }
        }

        self
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(self.arbitration.energy_threshold > 0.0 && self.arbitration.energy_threshold < 1.0) {
            return Err(CrosstalkError::ConfigInvalidValue {
                key: "arbitration.energy_threshold".to_string(),
                message: format!(
                    "must be between 0.0 and 1.0 (exclusive), got {}",
                    self.arbitration.energy_threshold
                ),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(CrosstalkError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.segmentation.silence_timeout_ms == 0 {
            return Err(CrosstalkError::ConfigInvalidValue {
                key: "segmentation.silence_timeout_ms".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.segmentation.max_utterance_ms <= self.segmentation.silence_timeout_ms {
            return Err(CrosstalkError::ConfigInvalidValue {
                key: "segmentation.max_utterance_ms".to_string(),
                message: format!(
                    "must exceed silence_timeout_ms ({})",
                    self.segmentation.silence_timeout_ms
                ),
            });
        }
        Ok(())
    }

    /// Render an annotated template of the default configuration.
    pub fn dump_template() -> String {
        let defaults = Self::default();
        format!(
            "\
# crosstalk configuration

[audio]
# Microphone device name; omit to use the system default input.
#local_device = \"pipewire\"
# System-audio device; omit to auto-detect a monitor/loopback source.
#ambient_device = \"alsa_output.pci-0000_00_1f.3.analog-stereo.monitor\"
sample_rate = {}

[arbitration]
# RMS level above which a source counts as speaking (0.0 - 1.0).
energy_threshold = {}
# Minimum interval between active-source switches.
hold_ms = {}
# Winner when both sources speak at once (\"local\" or \"ambient\").
overlap_winner = \"{}\"

[segmentation]
# Commit the utterance after this much silence.
silence_timeout_ms = {}
# Force-commit utterances longer than this.
max_utterance_ms = {}
",
            defaults.audio.sample_rate,
            defaults.arbitration.energy_threshold,
            defaults.arbitration.hold_ms,
            defaults.arbitration.overlap_winner,
            defaults.segmentation.silence_timeout_ms,
            defaults.segmentation.max_utterance_ms,
        )
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/crosstalk/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crosstalk")
            .join("config.toml")
    }

    /// Translate file configuration into the runtime pipeline configuration.
    pub fn pipeline_config(&self, log_switches: bool) -> PipelineConfig {
        PipelineConfig {
            arbiter: ArbiterConfig {
                threshold: self.arbitration.energy_threshold,
                hold: Duration::from_millis(self.arbitration.hold_ms),
                overlap_winner: self.arbitration.overlap_winner,
            },
            segmenter: SegmenterConfig {
                silence_timeout: Duration::from_millis(self.segmentation.silence_timeout_ms),
                max_utterance: Duration::from_millis(self.segmentation.max_utterance_ms),
            },
            sample_rate: self.audio.sample_rate,
            log_switches,
        }
    }
}
