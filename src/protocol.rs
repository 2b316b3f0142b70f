//! Wire format for the station's published messages
//!
//! Two messages go out each cycle: the literal `"Online"` status payload and
//! a JSON sensor report. The report's key set and units are fixed; dashboards
//! downstream key on them.

use crate::units::{celsius_to_fahrenheit, round1};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Payload published to the status topic every cycle.
pub const STATUS_ONLINE: &str = "Online";

/// Timestamp format for the `last_message` field (MM/DD/YYYY HH:MM:SS, local time).
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// One cycle's raw sensor snapshot, in native units (Celsius, %RH, hPa).
///
/// Created fresh each cycle and discarded once the report derived from it
/// has been published. Conversion happens in [`SensorReport::from_reading`],
/// never here.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Outside probe temperature, deg C
    pub outside_temp_c: f64,
    /// Relative humidity from the combined probe, %
    pub humidity: f64,
    /// Barometric pressure from the combined probe, hPa
    pub pressure_hpa: f64,
    /// Enclosure temperature from the combined probe, deg C
    pub enclosure_temp_c: f64,
    /// Host CPU temperature, deg C
    pub cpu_temp_c: f64,
    /// When the snapshot was taken
    pub taken_at: DateTime<Local>,
}

/// The JSON sensor report as published. Temperatures in deg F, everything
/// rounded to one decimal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorReport {
    pub garage_humidity: f64,
    pub pressure: f64,
    pub garage_temp: f64,
    pub outside_temp: f64,
    pub last_message: String,
    pub cpu_temp: f64,
    pub system_uptime: String,
}

impl SensorReport {
    /// Derive the outgoing report from a raw reading plus the host uptime
    /// string: convert the three temperatures to Fahrenheit, round every
    /// numeric field to one decimal, and format the cycle timestamp.
    pub fn from_reading(reading: &SensorReading, system_uptime: String) -> Self {
        SensorReport {
            garage_humidity: round1(reading.humidity),
            pressure: round1(reading.pressure_hpa),
            garage_temp: round1(celsius_to_fahrenheit(reading.enclosure_temp_c)),
            outside_temp: round1(celsius_to_fahrenheit(reading.outside_temp_c)),
            last_message: reading.taken_at.format(TIMESTAMP_FORMAT).to_string(),
            cpu_temp: round1(celsius_to_fahrenheit(reading.cpu_temp_c)),
            system_uptime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference_reading() -> SensorReading {
        SensorReading {
            outside_temp_c: 10.0,
            humidity: 55.3,
            pressure_hpa: 1013.25,
            enclosure_temp_c: 22.0,
            cpu_temp_c: 45.0,
            taken_at: Local.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap(),
        }
    }

    #[test]
    fn test_report_converts_and_rounds() {
        let report =
            SensorReport::from_reading(&reference_reading(), "2 hours, 14 minutes".to_string());

        assert_eq!(report.garage_humidity, 55.3);
        assert_eq!(report.pressure, 1013.3);
        assert_eq!(report.garage_temp, 71.6);
        assert_eq!(report.outside_temp, 50.0);
        assert_eq!(report.cpu_temp, 113.0);
        assert_eq!(report.system_uptime, "2 hours, 14 minutes");
    }

    #[test]
    fn test_timestamp_format() {
        let report = SensorReport::from_reading(&reference_reading(), String::new());
        assert_eq!(report.last_message, "03/07/2024 14:05:09");
    }

    #[test]
    fn test_wire_keys() {
        let report = SensorReport::from_reading(&reference_reading(), "up".to_string());
        let value: serde_json::Value = serde_json::to_value(&report).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "garage_humidity",
            "pressure",
            "garage_temp",
            "outside_temp",
            "last_message",
            "cpu_temp",
            "system_uptime",
        ] {
            assert!(object.contains_key(key), "missing wire key {key}");
        }
        assert_eq!(object.len(), 7);
    }

    #[test]
    fn test_report_round_trips() {
        let report = SensorReport::from_reading(&reference_reading(), "3 days".to_string());
        let json = serde_json::to_string(&report).unwrap();
        let parsed: SensorReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
