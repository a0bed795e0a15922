//! Builder turning a [`Config`] into a `rumqttc` client and event loop.
//!
//! Credentials and the last will are applied to the `MqttOptions` before the
//! event loop exists, so the broker knows the will from the first CONNECT.

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, LastWill, MqttOptions};
use tracing::debug;

use super::{
    config::{Config, LastWillConfig},
    error::TransferError,
    publisher::qos_from_u8,
};

pub struct ClientBuilder {
    opts: MqttOptions,
    cap: usize,
}

impl ClientBuilder {
    pub fn new(client_id: impl Into<String>, host: impl Into<String>, port: u16, cap: usize) -> Self {
        Self {
            opts: MqttOptions::new(client_id, host, port),
            cap,
        }
    }

    /// Applies every connection setting found in `config`.
    ///
    /// An empty `client_id` is replaced with a random UUID.
    pub fn from_config(config: &Config) -> Result<Self, TransferError> {
        let client_id = if config.client_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            config.client_id.clone()
        };

        let cap = config.request_channel_capacity.unwrap_or(10) as usize;
        let mut builder = Self::new(client_id, config.host.clone(), config.port, cap)
            .keep_alive(config.keep_alive)
            .clean_session(config.clean_session)
            .max_inflight(config.max_inflight);

        if let Some(max_packet_size) = config.max_packet_size {
            builder = builder.max_packet_size(max_packet_size as usize, max_packet_size as usize);
        }

        match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder = builder.credentials(username.clone(), password.clone());
            }
            (Some(username), None) => {
                builder = builder.credentials(username.clone(), String::new());
            }
            (None, Some(_)) => {
                return Err(TransferError::ClientSetup(
                    "password given without a username".into(),
                ));
            }
            (None, None) => {}
        }

        if let Some(will) = &config.last_will {
            builder = builder.last_will(will)?;
        }

        Ok(builder)
    }

    pub fn keep_alive(mut self, secs: u64) -> Self {
        self.opts.set_keep_alive(Duration::from_secs(secs));
        self
    }

    pub fn max_packet_size(mut self, incoming: usize, outgoing: usize) -> Self {
        self.opts.set_max_packet_size(incoming, outgoing);
        self
    }

    pub fn clean_session(mut self, clean: bool) -> Self {
        self.opts.set_clean_session(clean);
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.opts.set_credentials(username, password);
        self
    }

    pub fn max_inflight(mut self, max: u16) -> Self {
        self.opts.set_inflight(max);
        self
    }

    /// Registers the message the broker publishes if we vanish without DISCONNECT.
    pub fn last_will(mut self, will: &LastWillConfig) -> Result<Self, TransferError> {
        let qos = qos_from_u8(will.qos)?;
        debug!("Registering last will on '{}'", will.topic);
        self.opts.set_last_will(LastWill::new(
            will.topic.clone(),
            will.payload.clone().into_bytes(),
            qos,
            will.retain,
        ));
        Ok(self)
    }

    pub fn options(&self) -> &MqttOptions {
        &self.opts
    }

    pub fn build(self) -> (AsyncClient, EventLoop) {
        AsyncClient::new(self.opts, self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            host: "localhost".into(),
            client_id: "host1".into(),
            username: Some("user".into()),
            password: Some("pass".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_config_applies_settings() {
        let builder = ClientBuilder::from_config(&config()).unwrap();
        let opts = builder.options();

        assert_eq!(opts.client_id(), "host1");
        assert_eq!(opts.keep_alive(), Duration::from_secs(90));
        assert_eq!(
            opts.credentials(),
            Some(("user".to_string(), "pass".to_string()))
        );
        assert_eq!(builder.cap, 10);
    }

    #[test]
    fn test_empty_client_id_generates_uuid() {
        let cfg = Config {
            client_id: String::new(),
            ..config()
        };
        let builder = ClientBuilder::from_config(&cfg).unwrap();
        assert_eq!(builder.options().client_id().len(), 36);
    }

    #[test]
    fn test_last_will_is_registered() {
        let cfg = Config {
            last_will: Some(LastWillConfig::new(
                "homeassistant/sensor/host1/state",
                r#"{"running":false}"#,
            )),
            ..config()
        };
        let builder = ClientBuilder::from_config(&cfg).unwrap();
        let will = builder.options().last_will().unwrap();

        assert_eq!(will.topic, "homeassistant/sensor/host1/state");
        assert_eq!(&will.message[..], br#"{"running":false}"#);
        assert!(!will.retain);
    }

    #[test]
    fn test_last_will_rejects_bad_qos() {
        let mut will = LastWillConfig::new("a/b", "x");
        will.qos = 7;
        let result = ClientBuilder::new("id", "localhost", 1883, 1).last_will(&will);
        assert!(matches!(result, Err(TransferError::InvalidMetadata(_))));
    }

    #[test]
    fn test_password_without_username_rejected() {
        let cfg = Config {
            username: None,
            ..config()
        };
        assert!(matches!(
            ClientBuilder::from_config(&cfg),
            Err(TransferError::ClientSetup(_))
        ));
    }

    #[tokio::test]
    async fn test_build_tcp_client() {
        let (_client, _event_loop) = ClientBuilder::from_config(&config()).unwrap().build();
    }
}
