//! Transport layer for broker communication
//!
//! Abstracts the MQTT client behind a trait so the publish cycle can be
//! driven against fakes in tests.

use std::time::Duration;

pub mod mqtt;

/// Delivery guarantee requested for a publish. Everything the station sends
/// is fire-and-forget, so at-most-once is the only mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosLevel {
    /// At most once - no broker acknowledgement.
    AtMostOnce,
}

/// Transport abstraction over the broker connection.
///
/// The contract the sampling loop relies on:
/// - `connect` starts the background connection and returns immediately;
///   readiness is awaited separately through `wait_until_ready`.
/// - `publish` is attempted regardless of connection state (the underlying
///   client may queue while disconnected) and reports failure instead of
///   panicking or hanging, so a bad publish never breaks the cadence.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Begin connecting and processing broker events in the background.
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Gracefully close the broker connection and stop the background task.
    async fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Block until the connection has been confirmed by the broker,
    /// checking once per `poll_interval` and logging each unsuccessful check.
    async fn wait_until_ready(&self, poll_interval: Duration);

    /// Publish a payload to a topic with the requested QoS.
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
    ) -> Result<(), Self::Error>;

    /// Whether the broker has currently acknowledged the connection.
    fn is_connected(&self) -> bool;

    /// Current connection state, if the connection has been started.
    fn connection_state(&self) -> Option<mqtt::ConnectionState>;
}
