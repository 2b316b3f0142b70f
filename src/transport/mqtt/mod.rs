//! MQTT transport implementation on rumqttc

pub mod client;
pub mod connection;

pub use client::MqttClient;
pub use connection::{ConnectionState, MqttError, ReconnectConfig};
