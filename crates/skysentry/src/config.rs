//! Configuration management for skysentry.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::radio::ChannelSet;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "skysentry";

/// Default backup directory name under the data directory.
const BACKUP_DIR_NAME: &str = "backup";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SKYSENTRY_`)
/// 2. TOML config file at `~/.config/skysentry/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Radio monitoring configuration.
    pub radio: RadioConfig,
    /// Capture pipeline configuration.
    pub capture: CaptureConfig,
    /// Backup store configuration.
    pub backup: BackupConfig,
    /// Failsafe configuration.
    pub failsafe: FailsafeConfig,
}

/// Radio monitoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Lowest channel frequency in MHz.
    pub base_channel_mhz: u32,
    /// Spacing between adjacent channels in MHz.
    pub channel_step_mhz: u32,
    /// Number of channels in the hop set.
    pub channel_count: u32,
    /// Interval between monitor ticks in milliseconds.
    pub poll_interval_ms: u64,
    /// Interval between periodic status events in seconds.
    pub status_interval_secs: u64,
    /// Number of bins in each spectrum sample.
    pub spectrum_bins: usize,
    /// Peak spectrum magnitude above which a sample is classified as
    /// interference.
    pub detection_threshold: f64,
    /// Maximum number of status points retained for reporting.
    pub timeline_capacity: usize,
}

/// Capture pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interval between capture ticks in milliseconds.
    pub interval_ms: u64,
    /// Maximum time to wait on a single capture source in milliseconds.
    pub source_timeout_ms: u64,
}

/// Backup store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory holding encrypted records.
    /// Defaults to `~/.local/share/skysentry/backup`
    pub directory: Option<PathBuf>,
}

/// Failsafe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeConfig {
    /// Return-to-home latitude in decimal degrees.
    pub home_lat: f64,
    /// Return-to-home longitude in decimal degrees.
    pub home_lon: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            base_channel_mhz: 2_400,
            channel_step_mhz: 5,
            channel_count: 16,
            poll_interval_ms: 100,
            status_interval_secs: 10,
            spectrum_bins: 1024,
            detection_threshold: 50.0,
            timeline_capacity: 4096,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            source_timeout_ms: 250,
        }
    }
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            home_lat: 0.0,
            home_lon: 0.0,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `SKYSENTRY_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation
    /// fails. A validation failure is fatal: the process must refuse to
    /// start with an empty channel set or a nonsensical threshold.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("SKYSENTRY_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.radio.channel_count == 0 {
            return Err(Error::config_validation(
                "radio.channel_count must be at least 1",
            ));
        }

        if self.radio.channel_step_mhz == 0 {
            return Err(Error::config_validation(
                "radio.channel_step_mhz must be greater than 0",
            ));
        }

        if self.radio.poll_interval_ms == 0 {
            return Err(Error::config_validation(
                "radio.poll_interval_ms must be greater than 0",
            ));
        }

        if self.radio.spectrum_bins == 0 {
            return Err(Error::config_validation(
                "radio.spectrum_bins must be greater than 0",
            ));
        }

        if !self.radio.detection_threshold.is_finite() || self.radio.detection_threshold <= 0.0 {
            return Err(Error::config_validation(format!(
                "radio.detection_threshold must be a positive finite value, got {}",
                self.radio.detection_threshold
            )));
        }

        if self.radio.timeline_capacity == 0 {
            return Err(Error::config_validation(
                "radio.timeline_capacity must be greater than 0",
            ));
        }

        if self.capture.interval_ms == 0 {
            return Err(Error::config_validation(
                "capture.interval_ms must be greater than 0",
            ));
        }

        if self.capture.source_timeout_ms == 0 {
            return Err(Error::config_validation(
                "capture.source_timeout_ms must be greater than 0",
            ));
        }

        if !(-90.0..=90.0).contains(&self.failsafe.home_lat) {
            return Err(Error::config_validation(format!(
                "failsafe.home_lat must be within [-90, 90], got {}",
                self.failsafe.home_lat
            )));
        }

        if !(-180.0..=180.0).contains(&self.failsafe.home_lon) {
            return Err(Error::config_validation(format!(
                "failsafe.home_lon must be within [-180, 180], got {}",
                self.failsafe.home_lon
            )));
        }

        Ok(())
    }

    /// Build the channel set described by the radio section.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel plan is invalid (empty set or zero
    /// step). `validate()` catches the same conditions earlier, so a
    /// validated config always yields a channel set.
    pub fn channel_set(&self) -> Result<ChannelSet> {
        ChannelSet::new(
            self.radio.base_channel_mhz,
            self.radio.channel_step_mhz,
            self.radio.channel_count,
        )
    }

    /// Get the backup directory, resolving defaults if not set.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.backup
            .directory
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(BACKUP_DIR_NAME))
    }

    /// Get the monitor poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.radio.poll_interval_ms)
    }

    /// Get the status event interval as a Duration.
    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.radio.status_interval_secs)
    }

    /// Get the capture tick interval as a Duration.
    #[must_use]
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture.interval_ms)
    }

    /// Get the per-source capture timeout as a Duration.
    #[must_use]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.capture.source_timeout_ms)
    }
}
