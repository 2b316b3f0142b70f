//! Sensor boundary: probe traits and the per-cycle readout
//!
//! The sampling loop sees exactly one operation, [`SensorReadout::sample`],
//! which reads the three sources in sequence and either returns a complete
//! [`SensorReading`] or fails as a whole, naming the sensor that broke.
//! Values stay in native units here; conversion happens where the outgoing
//! report is built.

use crate::protocol::SensorReading;
use async_trait::async_trait;
use chrono::Local;
use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;

pub mod bme280;
pub mod cpu;
pub mod ds18b20;
pub mod uptime;

/// Per-read timeout applied to every probe so a wedged sensor cannot stall
/// the sampling cadence indefinitely.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Which physical sensor a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    OutsideProbe,
    ClimateProbe,
    CpuThermal,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SensorKind::OutsideProbe => "outside temperature probe",
            SensorKind::ClimateProbe => "combined climate probe",
            SensorKind::CpuThermal => "cpu thermal sensor",
        };
        f.write_str(name)
    }
}

/// A failed sampling attempt. The whole cycle's reading is discarded; the
/// caller skips publishing and keeps the cadence.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("{sensor} read failed: {source}")]
    Read {
        sensor: SensorKind,
        #[source]
        source: io::Error,
    },
    #[error("{sensor} read timed out after {timeout:?}")]
    Timeout { sensor: SensorKind, timeout: Duration },
}

impl SensorError {
    /// The sensor this failure is attributed to.
    pub fn sensor(&self) -> SensorKind {
        match self {
            SensorError::Read { sensor, .. } | SensorError::Timeout { sensor, .. } => *sensor,
        }
    }
}

/// One humidity/pressure/temperature snapshot from the combined probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    /// Relative humidity, %
    pub humidity: f64,
    /// Barometric pressure, hPa
    pub pressure_hpa: f64,
    /// Probe temperature, deg C
    pub temperature_c: f64,
}

/// Single-value temperature probe (the outside DS18B20).
#[async_trait]
pub trait TemperatureProbe: Send {
    async fn read_temperature(&mut self) -> io::Result<f64>;
}

/// Combined humidity/pressure/temperature probe (the enclosure BME280).
#[async_trait]
pub trait ClimateProbe: Send {
    async fn read_climate(&mut self) -> io::Result<ClimateSample>;
}

/// Host CPU temperature source.
#[async_trait]
pub trait CpuTemperatureSource: Send {
    async fn read_temperature(&mut self) -> io::Result<f64>;
}

/// Human-readable host uptime, e.g. `"2 hours, 14 minutes"`.
#[async_trait]
pub trait UptimeProvider: Send + Sync {
    async fn uptime(&self) -> io::Result<String>;
}

/// Wraps the three sensor sources into one sequential "take a reading"
/// operation.
pub struct SensorReadout {
    outside: Box<dyn TemperatureProbe>,
    climate: Box<dyn ClimateProbe>,
    cpu: Box<dyn CpuTemperatureSource>,
    read_timeout: Duration,
}

impl SensorReadout {
    pub fn new(
        outside: Box<dyn TemperatureProbe>,
        climate: Box<dyn ClimateProbe>,
        cpu: Box<dyn CpuTemperatureSource>,
    ) -> Self {
        SensorReadout {
            outside,
            climate,
            cpu,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Take one complete reading, or fail naming the broken sensor.
    ///
    /// Reads are sequential and individually bounded by the read timeout.
    /// A failure anywhere discards the partial snapshot; no half-filled
    /// reading ever escapes.
    pub async fn sample(&mut self) -> Result<SensorReading, SensorError> {
        let limit = self.read_timeout;

        let outside_temp_c = timed(
            SensorKind::OutsideProbe,
            limit,
            self.outside.read_temperature(),
        )
        .await?;
        let climate = timed(SensorKind::ClimateProbe, limit, self.climate.read_climate()).await?;
        let cpu_temp_c =
            timed(SensorKind::CpuThermal, limit, self.cpu.read_temperature()).await?;

        Ok(SensorReading {
            outside_temp_c,
            humidity: climate.humidity,
            pressure_hpa: climate.pressure_hpa,
            enclosure_temp_c: climate.temperature_c,
            cpu_temp_c,
            taken_at: Local::now(),
        })
    }
}

async fn timed<T>(
    sensor: SensorKind,
    limit: Duration,
    read: impl Future<Output = io::Result<T>>,
) -> Result<T, SensorError> {
    match tokio::time::timeout(limit, read).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(SensorError::Read { sensor, source }),
        Err(_) => Err(SensorError::Timeout {
            sensor,
            timeout: limit,
        }),
    }
}
