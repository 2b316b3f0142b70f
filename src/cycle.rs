//! The sample-and-publish loop
//!
//! One iteration per configured interval: sample the sensors, derive the
//! outgoing report, publish status and sensor payloads, then sleep whatever
//! is left of the interval. Sensor and publish failures are absorbed per
//! cycle; only the shutdown signal stops the loop.

use crate::config::StationConfig;
use crate::protocol::{SensorReport, STATUS_ONLINE};
use crate::sensors::{SensorReadout, UptimeProvider};
use crate::transport::{QosLevel, Transport};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Fallback uptime string when the host lookup fails. A good reading is
/// still worth publishing without it.
const UPTIME_UNKNOWN: &str = "unknown";

pub struct PublishCycle {
    config: Arc<StationConfig>,
    readout: SensorReadout,
    uptime: Box<dyn UptimeProvider>,
}

impl PublishCycle {
    pub fn new(
        config: Arc<StationConfig>,
        readout: SensorReadout,
        uptime: Box<dyn UptimeProvider>,
    ) -> Self {
        PublishCycle {
            config,
            readout,
            uptime,
        }
    }

    /// Run cycles until the shutdown watch flips.
    ///
    /// Drift compensation: each sleep is `interval - elapsed`, saturating at
    /// zero, so the average period tracks the configured interval even when
    /// sampling or publishing is slow. Cycles are strictly sequential; an
    /// overrunning cycle delays the next one rather than overlapping it.
    pub async fn run<T: Transport>(
        &mut self,
        transport: &T,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(interval = ?self.config.read_interval, "Publish cycle started");

        while !*shutdown_rx.borrow() {
            let cycle_start = Instant::now();
            self.run_once(transport).await;

            let elapsed = cycle_start.elapsed();
            match self.config.read_interval.checked_sub(elapsed) {
                Some(remaining) => {
                    tokio::select! {
                        changed = shutdown_rx.changed() => {
                            // A closed channel counts as a shutdown request.
                            if changed.is_err() {
                                warn!("Shutdown channel closed, stopping publish cycle");
                                break;
                            }
                        }
                        _ = tokio::time::sleep(remaining) => {}
                    }
                }
                None => {
                    debug!(?elapsed, "Cycle overran the interval, starting next immediately");
                }
            }
        }

        info!("Publish cycle stopped");
    }

    /// Execute a single sample-convert-publish iteration.
    ///
    /// A failed sample skips the publishes entirely - incomplete data is
    /// never sent. A failed publish is logged and the other publish is still
    /// attempted; the next cycle is the retry.
    pub async fn run_once<T: Transport>(&mut self, transport: &T) {
        let reading = match self.readout.sample().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(sensor = %e.sensor(), "Skipping cycle, sampling failed: {}", e);
                return;
            }
        };

        let system_uptime = match self.uptime.uptime().await {
            Ok(uptime) => uptime,
            Err(e) => {
                warn!("Host uptime lookup failed: {}", e);
                UPTIME_UNKNOWN.to_string()
            }
        };

        let report = SensorReport::from_reading(&reading, system_uptime);
        debug!(?report, "Assembled sensor report");

        if let Err(e) = transport
            .publish(
                &self.config.status_topic,
                STATUS_ONLINE.as_bytes().to_vec(),
                QosLevel::AtMostOnce,
            )
            .await
        {
            warn!(topic = %self.config.status_topic, "Status publish failed: {}", e);
        }

        match serde_json::to_vec(&report) {
            Ok(payload) => {
                if let Err(e) = transport
                    .publish(&self.config.sensors_topic, payload, QosLevel::AtMostOnce)
                    .await
                {
                    warn!(topic = %self.config.sensors_topic, "Sensor publish failed: {}", e);
                }
            }
            Err(e) => {
                warn!("Sensor report serialization failed: {}", e);
            }
        }
    }
}
