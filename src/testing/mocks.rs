//! Mock transport and fake sensors for testing
//!
//! The mock transport records every publish and supports scripted per-topic
//! failures and externally driven connection state; the fake probes return
//! fixed values or fail on scripted call numbers. Together they let the
//! cycle and agent be exercised without a broker or hardware.

use crate::sensors::{
    ClimateProbe, ClimateSample, CpuTemperatureSource, TemperatureProbe, UptimeProvider,
};
use crate::transport::mqtt::{ConnectionState, MqttError};
use crate::transport::{QosLevel, Transport};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QosLevel,
}

#[derive(Default)]
struct MockTransportInner {
    connected: AtomicBool,
    attempts: AtomicUsize,
    published: Mutex<Vec<PublishedMessage>>,
    failing_topics: Mutex<HashSet<String>>,
}

/// Recording mock transport. Clones share state, so a test can keep a
/// handle while the agent owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockTransportInner>,
}

impl MockTransport {
    /// Transport that starts disconnected; flip with [`set_connected`].
    ///
    /// [`set_connected`]: MockTransport::set_connected
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that reports Connected from the start.
    pub fn connected() -> Self {
        let transport = Self::default();
        transport.set_connected(true);
        transport
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    /// Make publishes to `topic` fail until cleared.
    pub fn fail_topic(&self, topic: &str) {
        self.inner
            .failing_topics
            .lock()
            .unwrap()
            .insert(topic.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.failing_topics.lock().unwrap().clear();
    }

    /// Successfully recorded publishes, in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.published.lock().unwrap().clone()
    }

    /// Messages recorded for one topic.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    /// Total publish attempts, including scripted failures.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.set_connected(false);
        Ok(())
    }

    async fn wait_until_ready(&self, poll_interval: Duration) {
        while !self.inner.connected.load(Ordering::SeqCst) {
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
    ) -> Result<(), Self::Error> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        if self.inner.failing_topics.lock().unwrap().contains(topic) {
            return Err(MqttError::PublishFailed(
                format!("scripted failure for {topic}").into(),
            ));
        }

        self.inner.published.lock().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            qos,
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        Some(if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected("mock".to_string())
        })
    }
}

/// Outside probe returning a fixed Celsius value.
pub struct FixedTemperatureProbe {
    value: f64,
}

impl FixedTemperatureProbe {
    pub fn new(value: f64) -> Self {
        FixedTemperatureProbe { value }
    }
}

#[async_trait]
impl TemperatureProbe for FixedTemperatureProbe {
    async fn read_temperature(&mut self) -> io::Result<f64> {
        Ok(self.value)
    }
}

/// Outside probe that fails on scripted call numbers (1-based) and counts
/// every call.
pub struct ScriptedTemperatureProbe {
    value: f64,
    fail_on: HashSet<usize>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTemperatureProbe {
    pub fn failing_on(value: f64, fail_calls: &[usize]) -> Self {
        ScriptedTemperatureProbe {
            value,
            fail_on: fail_calls.iter().copied().collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter; clone before boxing the probe.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl TemperatureProbe for ScriptedTemperatureProbe {
    async fn read_temperature(&mut self) -> io::Result<f64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("scripted probe failure on call {call}"),
            ))
        } else {
            Ok(self.value)
        }
    }
}

/// Combined probe returning a fixed humidity/pressure/temperature triple.
pub struct FixedClimateProbe {
    sample: ClimateSample,
}

impl FixedClimateProbe {
    pub fn new(humidity: f64, pressure_hpa: f64, temperature_c: f64) -> Self {
        FixedClimateProbe {
            sample: ClimateSample {
                humidity,
                pressure_hpa,
                temperature_c,
            },
        }
    }
}

#[async_trait]
impl ClimateProbe for FixedClimateProbe {
    async fn read_climate(&mut self) -> io::Result<ClimateSample> {
        Ok(self.sample)
    }
}

/// CPU temperature source returning a fixed Celsius value.
pub struct FixedCpuTemp {
    value: f64,
}

impl FixedCpuTemp {
    pub fn new(value: f64) -> Self {
        FixedCpuTemp { value }
    }
}

#[async_trait]
impl CpuTemperatureSource for FixedCpuTemp {
    async fn read_temperature(&mut self) -> io::Result<f64> {
        Ok(self.value)
    }
}

/// Uptime provider returning a fixed string.
pub struct FixedUptime {
    value: String,
}

impl FixedUptime {
    pub fn new(value: &str) -> Self {
        FixedUptime {
            value: value.to_string(),
        }
    }
}

#[async_trait]
impl UptimeProvider for FixedUptime {
    async fn uptime(&self) -> io::Result<String> {
        Ok(self.value.clone())
    }
}

/// Uptime provider that always fails.
pub struct FailingUptime;

#[async_trait]
impl UptimeProvider for FailingUptime {
    async fn uptime(&self) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::Other, "uptime unavailable"))
    }
}
