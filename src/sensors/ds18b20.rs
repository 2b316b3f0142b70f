//! DS18B20 1-Wire temperature probe via the kernel w1 sysfs interface
//!
//! The w1-therm driver exposes each probe as
//! `/sys/bus/w1/devices/28-*/w1_slave`. A read produces two lines: the raw
//! scratchpad with a `crc=.. YES|NO` verdict, then the same bytes with
//! `t=<millidegrees>` appended.

use super::TemperatureProbe;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Directory the w1 bus enumerates devices under.
pub const W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";

/// DS18B20 family code prefix in w1 device names.
const FAMILY_PREFIX: &str = "28-";

pub struct Ds18b20 {
    slave_file: PathBuf,
}

impl Ds18b20 {
    /// Probe backed by an explicit `w1_slave` file.
    pub fn new(slave_file: impl Into<PathBuf>) -> Self {
        Ds18b20 {
            slave_file: slave_file.into(),
        }
    }

    /// Find the first DS18B20 on the default w1 bus.
    pub async fn discover() -> io::Result<Self> {
        Self::discover_in(Path::new(W1_DEVICES_DIR)).await
    }

    async fn discover_in(devices_dir: &Path) -> io::Result<Self> {
        let mut entries = tokio::fs::read_dir(devices_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(FAMILY_PREFIX) {
                return Ok(Self::new(entry.path().join("w1_slave")));
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no DS18B20 (28-*) device under {}", devices_dir.display()),
        ))
    }
}

#[async_trait]
impl TemperatureProbe for Ds18b20 {
    async fn read_temperature(&mut self) -> io::Result<f64> {
        let raw = tokio::fs::read_to_string(&self.slave_file).await?;
        parse_w1_slave(&raw)
    }
}

/// Parse the two-line `w1_slave` format into degrees Celsius.
fn parse_w1_slave(raw: &str) -> io::Result<f64> {
    let mut lines = raw.lines();

    let crc_line = lines
        .next()
        .ok_or_else(|| invalid("empty w1_slave read"))?;
    if !crc_line.trim_end().ends_with("YES") {
        return Err(invalid("CRC check failed (crc=NO)"));
    }

    let data_line = lines
        .next()
        .ok_or_else(|| invalid("missing temperature line"))?;
    let milli = data_line
        .rsplit_once("t=")
        .ok_or_else(|| invalid("no t= field in w1_slave"))?
        .1
        .trim();
    let milli: i32 = milli
        .parse()
        .map_err(|_| invalid("non-numeric t= field in w1_slave"))?;

    Ok(f64::from(milli) / 1000.0)
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}
