//! wxstation - periodic MQTT telemetry agent
//!
//! Samples a small set of environmental sensors on a fixed cadence, converts
//! the readings to Fahrenheit / one-decimal form, and publishes a JSON
//! report plus an `"Online"` status message to an MQTT broker.
//!
//! # Overview
//!
//! - Probe traits and the per-cycle [`sensors::SensorReadout`]
//! - An MQTT connection supervisor with watch-channel state and
//!   retry-forever backoff ([`transport::mqtt::MqttClient`])
//! - A drift-compensated publish loop that tolerates sensor and publish
//!   failures without losing cadence ([`cycle::PublishCycle`])
//! - Environment-based configuration and structured logging
//!
//! # Quick Start
//!
//! ```rust
//! use wxstation::protocol::{SensorReading, SensorReport};
//! use chrono::Local;
//!
//! let reading = SensorReading {
//!     outside_temp_c: 10.0,
//!     humidity: 55.3,
//!     pressure_hpa: 1013.25,
//!     enclosure_temp_c: 22.0,
//!     cpu_temp_c: 45.0,
//!     taken_at: Local::now(),
//! };
//!
//! // Temperatures converted to deg F, everything rounded to one decimal.
//! let report = SensorReport::from_reading(&reading, "2 hours".to_string());
//! assert_eq!(report.outside_temp, 50.0);
//! assert_eq!(report.garage_temp, 71.6);
//!
//! let payload = serde_json::to_string(&report).unwrap();
//! assert!(payload.contains("\"pressure\":1013.3"));
//! ```

pub mod agent;
pub mod config;
pub mod cycle;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod sensors;
pub mod testing;
pub mod transport;
pub mod units;

pub use agent::StationAgent;
pub use config::{ConfigError, StationConfig};
pub use cycle::PublishCycle;
pub use error::{AgentError, AgentResult};
pub use protocol::{SensorReading, SensorReport};
pub use sensors::SensorReadout;
pub use transport::mqtt::MqttClient;
