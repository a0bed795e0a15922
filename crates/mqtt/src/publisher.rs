//! JSON publisher on top of a running [`MqttInstance`].

use std::sync::Arc;

use rumqttc::QoS;
use serde::Serialize;
use tracing::{debug, trace};

use super::{manager::MqttInstance, TransferError};

/// Maps the numeric QoS used in configuration onto `rumqttc::QoS`.
pub fn qos_from_u8(qos: u8) -> Result<QoS, TransferError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(TransferError::InvalidMetadata(format!(
            "Invalid QoS value: {other}"
        ))),
    }
}

/// Serializes payloads to compact JSON and hands them to the client.
#[derive(Clone)]
pub struct Publisher {
    instance: Arc<MqttInstance>,
    qos: QoS,
}

impl Publisher {
    pub fn new(instance: Arc<MqttInstance>, qos: u8) -> Result<Self, TransferError> {
        Ok(Self {
            instance,
            qos: qos_from_u8(qos)?,
        })
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    /// Publishes `data` as JSON on `topic`.
    ///
    /// Fails with `NotConnected` unless the broker connection is up, and
    /// when it drops while the request waits for room in the request
    /// channel. Nothing is queued across an outage.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        data: &T,
        retain: bool,
    ) -> Result<(), TransferError> {
        if self.instance.cancel_token().is_cancelled() {
            return Err(TransferError::Shutdown);
        }

        let state = self.instance.state();
        if !state.is_connected() {
            return Err(TransferError::NotConnected(state.to_string()));
        }

        let payload = serde_json::to_vec(data)?;

        debug!(
            "Publishing to topic '{}': {} bytes (retain: {})",
            topic,
            payload.len(),
            retain
        );
        trace!("Payload: {}", String::from_utf8_lossy(&payload));

        tokio::select! {
            result = self.instance.client().publish(topic, self.qos, retain, payload) => {
                result?;
                Ok(())
            }
            state = self.instance.disconnected() => {
                Err(TransferError::NotConnected(state.to_string()))
            }
        }
    }
}
