//! BME280 combined probe via the kernel IIO sysfs interface
//!
//! With the bmp280 IIO driver bound, the probe appears as an
//! `iio:deviceN` directory exposing processed channels in IIO ABI units:
//! `in_temp_input` in millidegrees C, `in_humidityrelative_input` in
//! milli-percent, `in_pressure_input` in kilopascals. The wire format wants
//! %RH and hPa, so this reader scales accordingly.

use super::{ClimateProbe, ClimateSample};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Conventional sysfs location of the first IIO device.
pub const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";

pub struct Bme280Iio {
    device_dir: PathBuf,
}

impl Bme280Iio {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Bme280Iio {
            device_dir: device_dir.into(),
        }
    }

    pub fn default_device() -> Self {
        Self::new(DEFAULT_IIO_DEVICE)
    }

    async fn read_channel(&self, channel: &str) -> io::Result<f64> {
        read_sysfs_f64(&self.device_dir.join(channel)).await
    }
}

#[async_trait]
impl ClimateProbe for Bme280Iio {
    async fn read_climate(&mut self) -> io::Result<ClimateSample> {
        let temp_milli_c = self.read_channel("in_temp_input").await?;
        let humidity_milli_pct = self.read_channel("in_humidityrelative_input").await?;
        let pressure_kpa = self.read_channel("in_pressure_input").await?;

        Ok(ClimateSample {
            humidity: humidity_milli_pct / 1000.0,
            pressure_hpa: pressure_kpa * 10.0,
            temperature_c: temp_milli_c / 1000.0,
        })
    }
}

/// Read a single-value sysfs attribute as f64.
pub(crate) async fn read_sysfs_f64(path: &Path) -> io::Result<f64> {
    let raw = tokio::fs::read_to_string(path).await?;
    raw.trim().parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("non-numeric sysfs value in {}", path.display()),
        )
    })
}
