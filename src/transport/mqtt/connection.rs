//! Pure connection state management for the MQTT client
//!
//! State types, reconnection backoff, and option construction live here so
//! the impure client module stays focused on I/O.

use crate::config::StationConfig;
use rumqttc::MqttOptions;
use std::time::Duration;
use thiserror::Error;

/// Connection state for the MQTT client.
///
/// Transitions are driven exclusively by broker events observed on the
/// event loop; the sampling loop only ever reads this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Initial state - attempting to connect
    Connecting,
    /// Broker acknowledged the connection; ready for operations
    Connected,
    /// Disconnected with reason
    Disconnected(String),
    /// Attempting to reconnect (attempt count)
    Reconnecting(u32),
}

impl ConnectionState {
    /// Next state when the broker acknowledges the connection.
    pub fn on_connected(session_present: bool) -> ConnectionState {
        tracing::info!(session_present, "MQTT broker acknowledged connection");
        ConnectionState::Connected
    }

    /// Next state when the connection is lost.
    pub fn on_disconnected(reason: &str) -> ConnectionState {
        tracing::warn!(reason, "MQTT connection lost");
        ConnectionState::Disconnected(reason.to_string())
    }
}

/// Reconnection backoff configuration.
///
/// The supervisor retries forever: a broker outage is recoverable by
/// definition and the agent is expected to run indefinitely. The pattern
/// covers the first attempts, then the sustained delay applies.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Backoff pattern in milliseconds for the first attempts
    pub backoff_pattern: Vec<u64>,
    /// Delay used once the pattern is exhausted
    pub sustained_delay: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            backoff_pattern: vec![500, 1000, 2000, 5000],
            sustained_delay: 5000,
        }
    }
}

impl ReconnectConfig {
    /// Backoff delay in milliseconds for the given attempt (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> u64 {
        let index = attempt.saturating_sub(1) as usize;
        self.backoff_pattern
            .get(index)
            .copied()
            .unwrap_or(self.sustained_delay)
    }
}

/// MQTT transport errors. All recoverable - the supervisor retries
/// connections, and the publish cycle logs publish failures and moves on.
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Publish timed out after {0:?}")]
    PublishTimeout(Duration),
    #[error("Disconnect failed")]
    DisconnectFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Connection already started")]
    AlreadyStarted,
}

/// Build rumqttc options from the station configuration.
///
/// Username/password authentication, plain TCP, keep-alive shorter than the
/// broker's default grace so a silent link is noticed between cycles.
pub fn configure_mqtt_options(config: &StationConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_credentials(&config.username, &config.password);
    options.set_keep_alive(Duration::from_secs(30));
    options
}
