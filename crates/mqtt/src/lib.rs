//! MQTT transport for hostbee.
//!
//! Thin layer over `rumqttc`:
//!
//! * [`ClientBuilder`] maps [`Config`] onto `MqttOptions` (credentials,
//!   keep-alive, last will).
//! * [`ConnectionKernel`] polls the event loop, reconnects after a fixed delay
//!   and broadcasts [`ConnectionState`] on a watch channel.
//! * [`MqttManager`] wires both together and returns an [`MqttInstance`].
//! * [`Publisher`] serializes payloads to JSON and publishes them with the
//!   configured QoS.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod publisher;
pub mod state;

pub use client::ClientBuilder;
pub use config::{Config, LastWillConfig};
pub use connection::ConnectionKernel;
pub use error::TransferError;
pub use manager::{MqttInstance, MqttManager};
pub use publisher::Publisher;
pub use state::ConnectionState;

pub type Result<T> = std::result::Result<T, TransferError>;
