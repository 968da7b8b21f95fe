use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PrehabError;
use crate::logging::LogConfig;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Anomaly detector thresholds
    #[serde(default)]
    pub anomaly: AnomalyConfig,

    /// Sequence forecaster hyper-parameters
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Values used when the request carries too little history
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Anomaly detector thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Minimum days of history before scanning (default: 5)
    pub min_points: usize,

    /// Absolute z-score above which a day is an outlier (default: 1.5)
    pub z_threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        AnomalyConfig {
            min_points: 5,
            z_threshold: 1.5,
        }
    }
}

/// Sequence forecaster hyper-parameters
///
/// Window length (7 days) and horizon (15 days) are part of the forecast
/// contract and are not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Minimum days of history required to retrain (default: 14)
    pub min_training_points: usize,

    /// Full-batch gradient passes per retrain (default: 50)
    pub epochs: usize,

    /// Adam learning rate (default: 0.001)
    pub learning_rate: f64,

    /// Recurrent hidden state width (default: 16)
    pub hidden_size: usize,

    /// Seed for the initial weights
    pub seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            min_training_points: 14,
            epochs: 50,
            learning_rate: 0.001,
            hidden_size: 16,
            seed: 42,
        }
    }
}

/// Synthetic-history and default-input settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Days of synthetic history generated (default: 15)
    pub synthetic_days: usize,

    /// Day index receiving the injected load spike (default: 11)
    pub spike_index: usize,

    /// Load multiplier on the spike day (default: 2.0)
    pub spike_multiplier: f64,

    /// Load used when the request has no load metrics (default: 50)
    pub default_load: f64,

    /// HRV used when the request has no biometrics (default: 60)
    pub default_hrv: f64,

    /// Sleep used when the request has no biometrics (default: 7.0)
    pub default_sleep_hours: f64,

    /// Mental fatigue used when the request has no wellness data (default: 5)
    pub default_fatigue: i32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            synthetic_days: 15,
            spike_index: 11,
            spike_multiplier: 2.0,
            default_load: 50.0,
            default_hrv: 60.0,
            default_sleep_hours: 7.0,
            default_fatigue: 5,
        }
    }
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            metadata: ConfigMetadata::default(),
            anomaly: AnomalyConfig::default(),
            forecast: ForecastConfig::default(),
            fallback: FallbackConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prehab")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %err,
                    "Config file not loaded, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> std::result::Result<(), PrehabError> {
        let invalid = |msg: String| Err(PrehabError::Configuration(msg));

        if self.forecast.hidden_size == 0 {
            return invalid("forecast.hidden_size must be at least 1".to_string());
        }
        if !(self.forecast.learning_rate > 0.0 && self.forecast.learning_rate.is_finite()) {
            return invalid(format!(
                "forecast.learning_rate must be positive, got {}",
                self.forecast.learning_rate
            ));
        }
        if !(self.anomaly.z_threshold >= 0.0) {
            return invalid(format!(
                "anomaly.z_threshold must be non-negative, got {}",
                self.anomaly.z_threshold
            ));
        }
        if self.fallback.synthetic_days == 0 {
            return invalid("fallback.synthetic_days must be at least 1".to_string());
        }
        Ok(())
    }
}
