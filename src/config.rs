//! Environment-based station configuration
//!
//! All settings come from the process environment, loaded once at start-up
//! and shared read-only afterwards. Only configuration problems are fatal;
//! everything downstream of a valid config is recoverable.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Default status topic when `MQTT_STATUS_TOPIC` is unset.
pub const DEFAULT_STATUS_TOPIC: &str = "raspberry/ws/status";
/// Default sensors topic when `MQTT_SENSORS_TOPIC` is unset.
pub const DEFAULT_SENSORS_TOPIC: &str = "raspberry/ws/sensors";
/// Default sampling interval in seconds when `READ_INTERVAL` is unset.
pub const DEFAULT_READ_INTERVAL_SECS: u64 = 5;
/// Default MQTT client identifier when `MQTT_CLIENT_ID` is unset.
pub const DEFAULT_CLIENT_ID: &str = "wxstation";

/// Immutable station configuration, resolved from the environment.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StationConfig {
    /// MQTT broker hostname or IP
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Broker username
    pub username: String,
    /// Broker password
    #[serde(skip_serializing)]
    pub password: String,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Topic for the `"Online"` liveness message
    pub status_topic: String,
    /// Topic for the JSON sensor report
    pub sensors_topic: String,
    /// Target spacing between publish cycles
    pub read_interval: Duration,
}

/// Configuration loading errors - the only fatal error class.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable not set: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

impl StationConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// The lookup seam keeps loading a pure function so tests never have to
    /// mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = required(&lookup, "MQTT_HOST")?;
        let port = parse_var(&lookup, "MQTT_PORT", None)?;
        let username = required(&lookup, "MQTT_USER")?;
        let password = required(&lookup, "MQTT_PASSWORD")?;

        let interval_secs: u64 =
            parse_var(&lookup, "READ_INTERVAL", Some(DEFAULT_READ_INTERVAL_SECS))?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidVar {
                name: "READ_INTERVAL",
                reason: "interval must be at least 1 second".to_string(),
            });
        }

        Ok(StationConfig {
            host,
            port,
            username,
            password,
            client_id: lookup("MQTT_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            status_topic: lookup("MQTT_STATUS_TOPIC")
                .unwrap_or_else(|| DEFAULT_STATUS_TOPIC.to_string()),
            sensors_topic: lookup("MQTT_SENSORS_TOPIC")
                .unwrap_or_else(|| DEFAULT_SENSORS_TOPIC.to_string()),
            read_interval: Duration::from_secs(interval_secs),
        })
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        StationConfig {
            host: "localhost".to_string(),
            port: 1883,
            username: "station".to_string(),
            password: "hunter2".to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            status_topic: DEFAULT_STATUS_TOPIC.to_string(),
            sensors_topic: DEFAULT_SENSORS_TOPIC.to_string(),
            read_interval: Duration::from_secs(5),
        }
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            name,
            reason: e.to_string(),
        }),
        None => default.ok_or(ConfigError::MissingVar(name)),
    }
}
