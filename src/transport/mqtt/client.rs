//! Impure I/O for the MQTT connection supervisor
//!
//! Owns the rumqttc client and the background task that drives its event
//! loop. Connection state flows to the sampling loop through a watch
//! channel, which both satisfies the cross-context visibility requirement
//! and gives `wait_until_ready` its blocking contract.

use super::connection::{configure_mqtt_options, ConnectionState, MqttError, ReconnectConfig};
use crate::config::StationConfig;
use crate::transport::{QosLevel, Transport};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bound on how long a single publish may wait to be enqueued. The sampling
/// cadence must never hang on a slow transport.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// How long disconnect waits for the supervisor task to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Bound on the supervisor's final drain of the event loop. Must stay well
/// inside `SHUTDOWN_GRACE` so the disconnect join never times out on it.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(1);

/// MQTT connection supervisor.
///
/// `connect` is non-blocking: it spawns the event-loop task and returns, so
/// the caller can separately block in `wait_until_ready`. The supervisor
/// retries a lost connection forever with backoff - broker unreachability
/// is never fatal.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: std::sync::Mutex<Option<EventLoop>>,
    reconnect_config: ReconnectConfig,
    state_rx: Option<watch::Receiver<ConnectionState>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    supervisor_handle: Option<JoinHandle<()>>,
}

impl MqttClient {
    pub fn new(config: &StationConfig) -> Self {
        let options = configure_mqtt_options(config);
        let (client, event_loop) = AsyncClient::new(options, 10);

        MqttClient {
            client,
            event_loop: std::sync::Mutex::new(Some(event_loop)),
            reconnect_config: ReconnectConfig::default(),
            state_rx: None,
            shutdown_tx: None,
            supervisor_handle: None,
        }
    }

    pub fn with_reconnect_config(mut self, reconnect_config: ReconnectConfig) -> Self {
        self.reconnect_config = reconnect_config;
        self
    }

    /// Create connection state and shutdown channels.
    /// Pure function for channel setup - easily testable.
    fn setup_connection_channels() -> (
        (
            watch::Sender<ConnectionState>,
            watch::Receiver<ConnectionState>,
        ),
        (watch::Sender<bool>, watch::Receiver<bool>),
    ) {
        (
            watch::channel(ConnectionState::Connecting),
            watch::channel(false),
        )
    }

    /// Sleep that aborts early on the shutdown signal.
    /// Returns true if the sleep completed, false if shutdown was requested.
    async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay_ms: u64) -> bool {
        tokio::select! {
            _ = shutdown_rx.changed() => !*shutdown_rx.borrow(),
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => true,
        }
    }

    /// Start connecting and processing broker events in the background.
    ///
    /// Returns immediately; the connection is confirmed asynchronously and
    /// observed through `wait_until_ready` / `is_connected`.
    pub fn connect(&mut self) -> Result<(), MqttError> {
        let mut event_loop = self
            .event_loop
            .lock()
            .expect("event loop lock poisoned")
            .take()
            .ok_or(MqttError::AlreadyStarted)?;

        let ((state_tx, state_rx), (shutdown_tx, mut shutdown_rx)) =
            Self::setup_connection_channels();
        self.state_rx = Some(state_rx);
        self.shutdown_tx = Some(shutdown_tx);

        let reconnect_config = self.reconnect_config.clone();

        let handle = tokio::spawn(async move {
            info!("Starting MQTT connection supervisor");
            let mut failure_streak = 0u32;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Shutdown signal received, draining connection supervisor");
                            Self::drain_event_loop(&mut event_loop).await;
                            break;
                        }
                    }

                    event = event_loop.poll() => match event {
                        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                            if ack.code == ConnectReturnCode::Success {
                                failure_streak = 0;
                                let _ = state_tx.send(
                                    ConnectionState::on_connected(ack.session_present),
                                );
                            } else {
                                let _ = state_tx.send(ConnectionState::on_disconnected(
                                    &format!("broker refused connection: {:?}", ack.code),
                                ));
                            }
                        }
                        Ok(Event::Incoming(Packet::Disconnect)) => {
                            let _ = state_tx
                                .send(ConnectionState::on_disconnected("broker disconnected"));
                        }
                        Ok(event) => {
                            debug!(?event, "MQTT event");
                        }
                        Err(e) => {
                            let _ = state_tx.send(ConnectionState::on_disconnected(&e.to_string()));

                            failure_streak += 1;
                            let delay_ms = reconnect_config.backoff_delay(failure_streak);
                            let _ = state_tx.send(ConnectionState::Reconnecting(failure_streak));
                            info!(
                                attempt = failure_streak,
                                delay_ms, "Retrying MQTT connection after backoff"
                            );

                            // The next poll() re-dials the broker.
                            if !Self::interruptible_sleep(shutdown_rx.clone(), delay_ms).await {
                                info!("Shutdown signal received during reconnect backoff");
                                break;
                            }
                        }
                    }
                }
            }
            info!("MQTT connection supervisor stopped");
        });

        self.supervisor_handle = Some(handle);
        Ok(())
    }

    /// Final drain after a shutdown request: keep polling until the outgoing
    /// DISCONNECT has been transmitted, the connection drops, or the drain
    /// bound expires. Requests queued just before shutdown (the DISCONNECT
    /// itself, a last publish) only reach the wire through these polls.
    async fn drain_event_loop(event_loop: &mut EventLoop) {
        let deadline = tokio::time::Instant::now() + SHUTDOWN_DRAIN;
        loop {
            match tokio::time::timeout_at(deadline, event_loop.poll()).await {
                Ok(Ok(Event::Outgoing(Outgoing::Disconnect))) => {
                    info!("DISCONNECT transmitted, connection drained");
                    return;
                }
                Ok(Ok(event)) => {
                    debug!(?event, "MQTT event during shutdown drain");
                }
                Ok(Err(e)) => {
                    debug!("Connection closed during shutdown drain: {}", e);
                    return;
                }
                Err(_) => {
                    warn!("Drain window expired before DISCONNECT was transmitted");
                    return;
                }
            }
        }
    }

    /// Block until the broker has acknowledged the connection, checking the
    /// state once per `poll_interval` and logging each unsuccessful check.
    pub async fn wait_until_ready(&self, poll_interval: Duration) {
        loop {
            if self.is_connected() {
                return;
            }
            info!(state = ?self.connection_state(), "Broker not ready, waiting");
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Publish regardless of connection state; rumqttc queues while the
    /// link is down. Bounded by the publish timeout so the cadence never
    /// hangs; failures are reported, never thrown across the cycle.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
    ) -> Result<(), MqttError> {
        let qos = match qos {
            QosLevel::AtMostOnce => QoS::AtMostOnce,
        };

        match tokio::time::timeout(
            PUBLISH_TIMEOUT,
            self.client.publish(topic, qos, false, payload),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(MqttError::PublishFailed(Box::new(e))),
            Err(_) => Err(MqttError::PublishTimeout(PUBLISH_TIMEOUT)),
        }
    }

    /// Request a broker DISCONNECT, then stop the supervisor task with a
    /// bounded wait for it to wind down.
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        // The supervisor drains the event loop on shutdown, so a DISCONNECT
        // queued here reaches the wire before the task stops.
        if let Err(e) = self.client.disconnect().await {
            debug!("DISCONNECT request not queued: {}", e);
        }

        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
            info!("Sent shutdown signal to connection supervisor");
        }

        if let Some(handle) = self.supervisor_handle.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => info!("Connection supervisor shut down gracefully"),
                Ok(Err(e)) if !e.is_cancelled() => {
                    warn!("Connection supervisor ended with error: {}", e);
                }
                Err(_) => {
                    warn!("Connection supervisor did not stop in time, aborting");
                }
                _ => {}
            }
        }

        info!("MQTT client disconnected");
        Ok(())
    }

    /// Current connection state; None before `connect` has been called.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.state_rx.as_ref().map(|rx| rx.borrow().clone())
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection_state(), Some(ConnectionState::Connected))
    }
}

#[async_trait::async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        MqttClient::connect(self)
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        MqttClient::disconnect(self).await
    }

    async fn wait_until_ready(&self, poll_interval: Duration) {
        MqttClient::wait_until_ready(self, poll_interval).await
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
    ) -> Result<(), Self::Error> {
        MqttClient::publish(self, topic, payload, qos).await
    }

    fn is_connected(&self) -> bool {
        MqttClient::is_connected(self)
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        MqttClient::connection_state(self)
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Stop the background task; graceful teardown needs an explicit
        // disconnect() call since Drop cannot await.
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = self.supervisor_handle.take() {
            handle.abort();
        }
    }
}
