//! Configuration structures for the MQTT transport.
//!
//! All configurations support serde deserialization, making them usable from
//! the `[transport]` section of the application TOML file. Constraints are
//! enforced by the `validator` crate so that an invalid configuration fails at
//! load time rather than at connect time.
//!
//! # Examples
//!
//! ```ignore
//! let config = Config {
//!     host: "mqtt.home.local".into(),
//!     username: Some("hass".into()),
//!     password: Some("secret".into()),
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Main MQTT connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Broker hostname or IP address.
    ///
    /// Actual DNS resolution happens at connection time, not validation time.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port number (1883 for plain MQTT).
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// User name passed to the broker as-is.
    pub username: Option<String>,

    /// Password passed to the broker as-is. Never logged.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Unique identifier for this client.
    ///
    /// If empty, a UUID is generated when the client is built.
    #[validate(length(max = 65535, message = "Client ID is too long"))]
    pub client_id: String,

    /// Keep-alive interval in seconds.
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// Whether to request a clean session from the broker.
    pub clean_session: bool,

    /// Maximum number of QoS 1 and QoS 2 messages in flight simultaneously.
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Max inflight must be between 1 and 1000"
    ))]
    pub max_inflight: u16,

    /// Maximum MQTT packet size (bytes), applied to both directions.
    #[validate(range(
        min = 64,
        max = 65535,
        message = "Max packet size must be between 64 and 65535 bytes"
    ))]
    pub max_packet_size: Option<u16>,

    /// How many requests can be queued towards the event loop before
    /// `publish` starts waiting.
    #[validate(range(
        min = 1,
        max = 255,
        message = "Request channel capacity must be between 1 and 255"
    ))]
    pub request_channel_capacity: Option<u8>,

    /// Fixed delay between reconnection attempts (seconds).
    #[validate(range(
        min = 1,
        max = 300,
        message = "Reconnect delay must be between 1 and 300 seconds"
    ))]
    pub reconnect_delay: u64,

    /// QoS used for every publish.
    #[validate(range(min = 0, max = 2, message = "Invalid QoS value, must be 0, 1, or 2"))]
    pub qos: u8,

    /// Message the broker publishes on our behalf when the connection is lost.
    ///
    /// Not read from configuration files: the application derives it from
    /// its own topic layout before building the client.
    #[serde(skip)]
    #[validate(nested)]
    pub last_will: Option<LastWillConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::new(),
            port: 1883,
            username: None,
            password: None,
            client_id: String::new(),
            keep_alive: 90,
            clean_session: true,
            max_inflight: 10,
            max_packet_size: Some(65_535),
            request_channel_capacity: Some(10),
            reconnect_delay: 5,
            qos: 0,
            last_will: None,
        }
    }
}

/// Last will registered with the broker before connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LastWillConfig {
    #[validate(custom(function = "validate_topic"))]
    pub topic: String,
    pub payload: String,
    #[validate(range(min = 0, max = 2, message = "Invalid QoS value, must be 0, 1, or 2"))]
    pub qos: u8,
    pub retain: bool,
}

impl LastWillConfig {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: 0,
            retain: false,
        }
    }
}

/// Rejects empty topics and topics carrying subscription wildcards.
fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        return Err(ValidationError::new("empty_topic")
            .with_message("Topic must not be empty".into()));
    }
    if topic.contains(['+', '#']) {
        return Err(ValidationError::new("wildcard_topic")
            .with_message(format!("Topic must not contain wildcards: {topic}").into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            host: "broker.local".into(),
            username: Some("user".into()),
            password: Some("pass".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive, 90);
        assert_eq!(config.qos, 0);
        assert!(config.last_will.is_none());
    }

    #[test]
    fn test_default_requires_host() {
        assert!(Config::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let config = Config {
            port: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_qos_rejected() {
        let config = Config {
            qos: 3,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_last_will_topic_validation() {
        let mut config = valid_config();
        config.last_will = Some(LastWillConfig::new("a/+/state", "{}"));
        assert!(config.validate().is_err());

        config.last_will = Some(LastWillConfig::new("a/b/state", "{}"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            host = "10.0.0.2"
            port = 1884
            username = "hass"
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 1884);
        assert_eq!(config.username.as_deref(), Some("hass"));
        assert_eq!(config.keep_alive, 90);
    }

    #[test]
    fn test_password_not_serialized() {
        let rendered = serde_json::to_string(&valid_config()).unwrap();
        assert!(!rendered.contains("password"));
        assert!(rendered.contains("\"username\":\"user\""));
    }
}
