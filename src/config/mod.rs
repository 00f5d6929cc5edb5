use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Highest tick rate honoured; faster rates are clamped to one tick per millisecond
pub const MAX_TICK_RATE_HZ: u32 = 1000;

/// Playback configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Maximum idle instances kept for reuse; unset keeps all of them
    pub pool_capacity: Option<usize>,
    /// Frame scheduler rate used by the ticker
    pub tick_rate_hz: u32,
    pub log_level: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pool_capacity: None,
            tick_rate_hz: 60,
            log_level: "info".to_string(),
        }
    }
}

impl PlaybackConfig {
    /// Tick rate clamped to `1..=MAX_TICK_RATE_HZ`
    pub fn effective_tick_rate(&self) -> u32 {
        self.tick_rate_hz.clamp(1, MAX_TICK_RATE_HZ)
    }

    /// Period between scheduler ticks, never zero
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.effective_tick_rate()))
            .max(Duration::from_millis(1))
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: PlaybackConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from the default location, falling back to defaults
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Ok(Self::open(config_path))
    }

    /// Load from an explicit path, falling back to defaults
    pub fn open(config_path: PathBuf) -> Self {
        let config = match Self::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring configuration at {}: {}", config_path.display(), e);
                PlaybackConfig::default()
            }
        };

        Self { config, config_path }
    }

    pub fn get_config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Persist a new tick rate, clamped to the supported range
    pub fn set_tick_rate(&mut self, tick_rate_hz: u32) -> Result<(), ConfigError> {
        self.config.tick_rate_hz = tick_rate_hz.clamp(1, MAX_TICK_RATE_HZ);
        self.save_config()
    }

    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("sound-instance");

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<PlaybackConfig, ConfigError> {
        if !path.exists() {
            return Ok(PlaybackConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: PlaybackConfig = toml::from_str(&config_content)?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        // Ensure the parent directory exists
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}
