//! # homesim-adapter-mqtt
//!
//! MQTT adapter: carries homesim device traffic over an MQTT broker.
//!
//! ## Responsibilities
//! - Build the rumqttc client from [`MqttConfig`]
//! - Implement the `Transport` port: publish, subscribe, unsubscribe, disconnect
//! - Pump the rumqttc event loop and translate its notifications into
//!   `TransportEvent`s (connection lifecycle, inbound messages, subscription
//!   and delivery acknowledgements)
//! - Retry the connection after a configurable delay
//!
//! ## Dependency rule
//! Same as other adapters: depends on `homesim-app` and `homesim-domain`.

pub mod config;
pub mod error;
mod pump;
mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::{MqttTransport, connect};
