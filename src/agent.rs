//! Station lifecycle: wiring, readiness gating, and shutdown
//!
//! Generic over [`Transport`] so the whole agent can run against the mock
//! transport in tests. Orchestration only - the interesting behavior lives
//! in the cycle and the connection supervisor.

use crate::config::StationConfig;
use crate::cycle::PublishCycle;
use crate::sensors::{SensorReadout, UptimeProvider};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// How often `run` re-checks connection readiness before the first cycle.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct StationAgent<T: Transport> {
    transport: T,
    cycle: PublishCycle,
}

impl<T: Transport> StationAgent<T> {
    pub fn new(
        config: Arc<StationConfig>,
        transport: T,
        readout: SensorReadout,
        uptime: Box<dyn UptimeProvider>,
    ) -> Self {
        StationAgent {
            transport,
            cycle: PublishCycle::new(config, readout, uptime),
        }
    }

    /// Start the background broker connection. Non-blocking; readiness is
    /// awaited at the top of [`run`](StationAgent::run).
    pub async fn initialize(&mut self) -> Result<(), T::Error> {
        self.transport.connect().await
    }

    /// Block until the broker is ready, then run publish cycles until the
    /// shutdown watch flips. No sampling or publishing happens before the
    /// connection has been confirmed at least once.
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = self.transport.wait_until_ready(READY_POLL_INTERVAL) => break,
                changed = shutdown_rx.changed() => {
                    // A closed channel counts as a shutdown request.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown requested before broker became ready");
                        return;
                    }
                }
            }
        }

        info!("Broker connection ready, starting publish cycle");
        self.cycle.run(&self.transport, shutdown_rx).await;
    }

    /// Gracefully close the broker connection.
    pub async fn shutdown(&mut self) -> Result<(), T::Error> {
        info!("Shutting down station agent");
        self.transport.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{
        FixedClimateProbe, FixedCpuTemp, FixedTemperatureProbe, FixedUptime, MockTransport,
    };

    fn test_agent(transport: MockTransport) -> StationAgent<MockTransport> {
        let readout = SensorReadout::new(
            Box::new(FixedTemperatureProbe::new(10.0)),
            Box::new(FixedClimateProbe::new(55.3, 1013.25, 22.0)),
            Box::new(FixedCpuTemp::new(45.0)),
        );
        StationAgent::new(
            Arc::new(StationConfig::test_config()),
            transport,
            readout,
            Box::new(FixedUptime::new("5 minutes")),
        )
    }

    #[tokio::test]
    async fn test_shutdown_before_ready_returns_without_publishing() {
        let transport = MockTransport::new();
        let mut agent = test_agent(transport.clone());
        agent.initialize().await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        // Broker never becomes ready; the shutdown signal must win.
        agent.run(shutdown_rx).await;
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn test_closed_shutdown_channel_stops_waiting_agent() {
        let transport = MockTransport::new();
        let mut agent = test_agent(transport.clone());
        agent.initialize().await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        // Broker never becomes ready and the sender is gone; run must
        // return instead of spinning on the closed channel.
        tokio::time::timeout(Duration::from_secs(5), agent.run(shutdown_rx))
            .await
            .unwrap();
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_transport() {
        let transport = MockTransport::connected();
        let mut agent = test_agent(transport.clone());
        agent.shutdown().await.unwrap();
        assert!(!transport.is_connected());
    }
}
