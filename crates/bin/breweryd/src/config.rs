//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `breweryd.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Control loop settings.
    pub control: ControlConfig,
    /// Hardware settings.
    pub hardware: HardwareConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Control loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Pause between two ticks, in milliseconds.
    pub interval_ms: u64,
}

/// Relay board and sensor bus configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Number of relays on the board.
    pub relays: usize,
    /// Run the thermal model against the virtual sensors.
    pub simulate: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `breweryd.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("breweryd.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Unparsable numeric values are ignored and the previous value kept.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("BREWERY_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(interval) = var("BREWERY_INTERVAL_MS").and_then(|val| val.parse().ok()) {
            self.control.interval_ms = interval;
        }
        if let Some(relays) = var("BREWERY_RELAYS").and_then(|val| val.parse().ok()) {
            self.hardware.relays = relays;
        }
        if let Some(val) = var("BREWERY_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.control.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "control interval must be non-zero".to_string(),
            ));
        }
        if self.hardware.relays == 0 {
            return Err(ConfigError::Validation(
                "relay count must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.control.interval_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:brewery.db?mode=rwc".to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            relays: 8,
            simulate: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "breweryd=info,brewery_app=info,brewery_adapter_storage_sqlite_sqlx=info"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
