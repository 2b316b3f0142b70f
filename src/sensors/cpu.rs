//! Host CPU temperature from the kernel thermal zone interface

use super::{bme280::read_sysfs_f64, CpuTemperatureSource};
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

/// The SoC thermal zone on a Raspberry Pi.
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

pub struct CpuThermalZone {
    zone_file: PathBuf,
}

impl CpuThermalZone {
    pub fn new(zone_file: impl Into<PathBuf>) -> Self {
        CpuThermalZone {
            zone_file: zone_file.into(),
        }
    }

    pub fn default_zone() -> Self {
        Self::new(DEFAULT_THERMAL_ZONE)
    }
}

#[async_trait]
impl CpuTemperatureSource for CpuThermalZone {
    async fn read_temperature(&mut self) -> io::Result<f64> {
        // Thermal zone files report millidegrees Celsius.
        let milli = read_sysfs_f64(&self.zone_file).await?;
        Ok(milli / 1000.0)
    }
}
