//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `relayhub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use relayhub_adapter_mqtt::MqttConfig;
use relayhub_app::services::correlation_service::CorrelationSettings;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// MQTT broker and topic settings.
    pub mqtt: MqttConfig,
    /// Reply budgets and poll cadences.
    pub correlation: CorrelationConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Correlation timings, all in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub slave_reply_budget_ms: u64,
    pub base_reply_budget_ms: u64,
    pub tank_reply_budget_ms: u64,
    pub slave_reply_interval_ms: u64,
    pub device_reply_interval_ms: u64,
}

impl CorrelationConfig {
    /// Convert into the settings consumed by the correlation service.
    #[must_use]
    pub fn settings(&self) -> CorrelationSettings {
        CorrelationSettings {
            slave_reply_budget: Duration::from_millis(self.slave_reply_budget_ms),
            base_reply_budget: Duration::from_millis(self.base_reply_budget_ms),
            tank_reply_budget: Duration::from_millis(self.tank_reply_budget_ms),
            slave_reply_interval: Duration::from_millis(self.slave_reply_interval_ms),
            device_reply_interval: Duration::from_millis(self.device_reply_interval_ms),
        }
    }
}

impl Config {
    /// Load configuration from `relayhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("relayhub.toml")?;
        config.apply_env_overrides();
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

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RELAYHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("RELAYHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("RELAYHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("RELAYHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("RELAYHUB_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("RELAYHUB_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("RELAYHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt broker port must be non-zero".to_string(),
            ));
        }
        if self.mqtt.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "mqtt channel capacity must be non-zero".to_string(),
            ));
        }
        let correlation = &self.correlation;
        if correlation.slave_reply_interval_ms == 0 || correlation.device_reply_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:relayhub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "relayhubd=info,relayhub=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        let defaults = CorrelationSettings::default();
        Self {
            slave_reply_budget_ms: millis(defaults.slave_reply_budget),
            base_reply_budget_ms: millis(defaults.base_reply_budget),
            tank_reply_budget_ms: millis(defaults.tank_reply_budget),
            slave_reply_interval_ms: millis(defaults.slave_reply_interval),
            device_reply_interval_ms: millis(defaults.device_reply_interval),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
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
