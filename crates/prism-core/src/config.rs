use crate::error::{PrismError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the prism store
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Path of the SQLite database file holding both feature tables.
    pub db_path: ConfigValue<PathBuf>,
    /// Directory holding the spatial index file pair.
    pub index_dir: ConfigValue<PathBuf>,
    /// Radius in meters used when a query does not supply one.
    pub default_radius_m: ConfigValue<f64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            db_path: ConfigValue::new(PathBuf::from("flood_data.db"), ConfigSource::Default),
            index_dir: ConfigValue::new(PathBuf::from("spatial_index"), ConfigSource::Default),
            default_radius_m: ConfigValue::new(2500.0, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| PrismError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| PrismError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(db_path) = file_config.db_path {
            self.db_path.update(db_path, ConfigSource::File);
        }

        if let Some(index_dir) = file_config.index_dir {
            self.index_dir.update(index_dir, ConfigSource::File);
        }

        if let Some(default_radius_m) = file_config.default_radius_m {
            self.default_radius_m.update(default_radius_m, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(db_path) = env::var("PRISM_DB_PATH") {
            self.db_path.update(PathBuf::from(db_path), ConfigSource::Environment);
        }

        if let Ok(index_dir) = env::var("PRISM_INDEX_DIR") {
            self.index_dir.update(PathBuf::from(index_dir), ConfigSource::Environment);
        }

        if let Ok(radius_str) = env::var("PRISM_DEFAULT_RADIUS_M") {
            match radius_str.parse::<f64>() {
                Ok(radius) if radius > 0.0 => {
                    self.default_radius_m.update(radius, ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid PRISM_DEFAULT_RADIUS_M value '{}': expected positive number of meters",
                    radius_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(db_path) = overrides.db_path {
            self.db_path.update(db_path, ConfigSource::Cli);
        }

        if let Some(index_dir) = overrides.index_dir {
            self.index_dir.update(index_dir, ConfigSource::Cli);
        }

        if let Some(default_radius_m) = overrides.default_radius_m {
            self.default_radius_m.update(default_radius_m, ConfigSource::Cli);
        }
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    db_path: Option<PathBuf>,
    index_dir: Option<PathBuf>,
    default_radius_m: Option<f64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub db_path: Option<PathBuf>,
    pub index_dir: Option<PathBuf>,
    pub default_radius_m: Option<f64>,
}
