//! # Configuration Module
//!
//! Handles loading and validating the relay configuration from TOML files.
//!
//! The file carries the four required identity/endpoint strings plus a few
//! optional tuning knobs. Once accepted, the identity part is frozen into an
//! [`Identity`] value that is handed to the pipeline; nothing downstream reads
//! the file again.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::dispatch::OrderingMode;
use crate::error::{RelayError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Static identity fields stamped on every event
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub uuid: String,

    #[serde(default)]
    pub flight_id: String,
}

/// Local flight-data source
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

/// Remote telemetry collector
#[derive(Debug, Deserialize, Clone)]
pub struct DestinationConfig {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_destination_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub ordering: OrderingMode,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the daily rolling log file, disabled when absent
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

/// Immutable identity of this relay instance
///
/// Built once from an accepted [`Config`] and shared (usually behind an
/// [`Arc`]) by the encoder and the HTTP transports for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uuid: String,
    pub flight_id: String,
    pub source_endpoint: String,
    pub dest_endpoint: String,
}

// Default value functions
fn default_source_timeout_ms() -> u64 { 2000 }
fn default_destination_timeout_ms() -> u64 { 5000 }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - A required setting is missing or a value is out of range
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use telemetry_relay::config::Config;
    ///
    /// let config = Config::load("config.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Freeze the identity part of the configuration
    pub fn identity(&self) -> Arc<Identity> {
        Arc::new(Identity {
            uuid: self.telemetry.uuid.trim().to_string(),
            flight_id: self.telemetry.flight_id.trim().to_string(),
            source_endpoint: self.source.endpoint.trim().to_string(),
            dest_endpoint: self.destination.endpoint.trim().to_string(),
        })
    }

    /// Log the accepted configuration
    pub fn log_summary(&self) {
        info!("Configuration accepted");
        info!("  uuid: {}", self.telemetry.uuid);
        info!("  flight_id: {}", self.telemetry.flight_id);
        info!("  source endpoint: {}", self.source.endpoint);
        info!("  destination endpoint: {}", self.destination.endpoint);
        info!("  ordering: {:?}", self.destination.ordering);
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if a required value is empty or any value is out of range
    fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("telemetry.uuid", &self.telemetry.uuid),
            ("telemetry.flight_id", &self.telemetry.flight_id),
            ("source.endpoint", &self.source.endpoint),
            ("destination.endpoint", &self.destination.endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(RelayError::Config(format!("{} is required", key)));
            }
        }

        validate_endpoint("source.endpoint", &self.source.endpoint)?;
        validate_endpoint("destination.endpoint", &self.destination.endpoint)?;

        for (key, value) in [
            ("source.timeout_ms", self.source.timeout_ms),
            ("destination.timeout_ms", self.destination.timeout_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(RelayError::Config(format!(
                    "{} must be between 1 and 60000",
                    key
                )));
            }
        }

        if tracing::Level::from_str(&self.logging.level).is_err() {
            return Err(RelayError::Config(format!(
                "logging.level '{}' is not one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        if let Some(dir) = &self.logging.dir {
            if dir.trim().is_empty() {
                return Err(RelayError::Config(
                    "logging.dir cannot be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_endpoint(key: &str, value: &str) -> Result<()> {
    let url = reqwest::Url::parse(value.trim())
        .map_err(|e| RelayError::Config(format!("{} is not a valid URL: {}", key, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RelayError::Config(format!(
            "{} must use http or https, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[telemetry]
uuid = "abc"
flight_id = "F1"

[source]
endpoint = "http://127.0.0.1:9280/mandala"

[destination]
endpoint = "http://collector.local:9090/geoevent/telemetry"
"#;

    fn create_valid_config() -> Config {
        Config::from_toml(VALID).unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = create_valid_config();
        assert_eq!(config.source.timeout_ms, 2000);
        assert_eq!(config.destination.timeout_ms, 5000);
        assert_eq!(config.destination.ordering, OrderingMode::Strict);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_identity_from_config() {
        let identity = create_valid_config().identity();
        assert_eq!(identity.uuid, "abc");
        assert_eq!(identity.flight_id, "F1");
        assert_eq!(identity.source_endpoint, "http://127.0.0.1:9280/mandala");
        assert_eq!(
            identity.dest_endpoint,
            "http://collector.local:9090/geoevent/telemetry"
        );
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/telemetry-relay.toml");
        assert!(matches!(result, Err(RelayError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[telemetry\nuuid = ");
        assert!(matches!(result, Err(RelayError::ConfigParse(_))));
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let result = Config::from_toml(
            r#"
[telemetry]
uuid = "abc"
flight_id = "F1"

[source]
endpoint = "http://127.0.0.1:9280/mandala"
"#,
        );
        assert!(matches!(result, Err(RelayError::ConfigParse(_))));
    }

    #[test]
    fn test_each_required_field_is_checked() {
        for key in ["uuid", "flight_id"] {
            let mut config = create_valid_config();
            match key {
                "uuid" => config.telemetry.uuid = String::new(),
                _ => config.telemetry.flight_id = "   ".to_string(),
            }
            match config.validate() {
                Err(RelayError::Config(msg)) => assert!(msg.contains(key), "{}", msg),
                other => panic!("Expected Config error for {}, got: {:?}", key, other),
            }
        }

        let mut config = create_valid_config();
        config.source.endpoint = String::new();
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.destination.endpoint = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_endpoint_url() {
        let mut config = create_valid_config();
        config.source.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_endpoint() {
        let mut config = create_valid_config();
        config.destination.endpoint = "ftp://collector.local/telemetry".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_zero() {
        let mut config = create_valid_config();
        config.source.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_too_high() {
        let mut config = create_valid_config();
        config.destination.timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = create_valid_config();
        config.logging.dir = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
[telemetry]
uuid = "0f1e2d3c"
flight_id = "MSN-7"

[source]
endpoint = "http://10.0.0.2:9280/mandala"
timeout_ms = 500

[destination]
endpoint = "https://collector.example.com/geoevent/telemetry"
timeout_ms = 3000
ordering = "legacy"

[logging]
level = "debug"
dir = "./logs"
"#,
        )
        .unwrap();

        assert_eq!(config.source.timeout_ms, 500);
        assert_eq!(config.destination.ordering, OrderingMode::Legacy);
        assert_eq!(config.logging.dir.as_deref(), Some("./logs"));
    }

    #[test]
    fn test_unknown_ordering_is_rejected() {
        let result = Config::from_toml(&VALID.replace(
            "endpoint = \"http://collector.local:9090/geoevent/telemetry\"",
            "endpoint = \"http://collector.local:9090/geoevent/telemetry\"\nordering = \"random\"",
        ));
        assert!(matches!(result, Err(RelayError::ConfigParse(_))));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_source_timeout_ms(), 2000);
        assert_eq!(default_destination_timeout_ms(), 5000);
        assert_eq!(default_log_level(), "info");
    }
}
