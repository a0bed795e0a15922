//! Error handling for MQTT transfer operations.
//!
//! `TransferError` aggregates errors from configuration, serialization and the
//! network into a single type the application can pattern-match on.
//!
//! **Configuration errors** surface at startup (`ConfigError`, `ClientSetup`,
//! `InvalidMetadata`). **Runtime errors** come from the broker connection
//! (`ClientTransfer`, `ClientConnection`, `NotConnected`). A failed publish is always reported
//! to the caller; retrying is the caller's decision.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Publish parameters (QoS, topic) are out of range.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The payload could not be encoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The client could not be configured.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// Settings failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] validator::ValidationErrors),

    /// The request could not be handed over to the event loop.
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// The event loop reported a connection failure.
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// The broker connection is not up, so the request would only be queued.
    #[error("Not connected to broker: {0}")]
    NotConnected(String),

    /// The transport was shut down before the request was made.
    #[error("Transport is shut down")]
    Shutdown,
}

impl From<rumqttc::ConnectionError> for TransferError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransferError::ClientConnection(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_display() {
        let err = TransferError::InvalidMetadata("QoS must be 0-2".into());
        assert_eq!(err.to_string(), "Invalid metadata: QoS must be 0-2");
    }

    #[test]
    fn test_transfer_error_client_setup() {
        let err = TransferError::ClientSetup("client id rejected".into());
        assert!(err.to_string().contains("client id rejected"));
    }

    #[test]
    fn test_transfer_error_from_connection_error() {
        let conn_err = rumqttc::ConnectionError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        let err: TransferError = conn_err.into();
        assert!(matches!(err, TransferError::ClientConnection(_)));
        assert!(err.to_string().starts_with("Client connection error"));
    }

    #[test]
    fn test_transfer_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TransferError = json_err.into();
        assert!(err.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_transfer_error_not_connected() {
        let err = TransferError::NotConnected("Reconnecting (in 5 seconds)".into());
        assert_eq!(
            err.to_string(),
            "Not connected to broker: Reconnecting (in 5 seconds)"
        );
    }

    #[test]
    fn test_transfer_error_is_std_error() {
        let err: Box<dyn std::error::Error + Send + Sync> = Box::new(TransferError::Shutdown);
        assert_eq!(err.to_string(), "Transport is shut down");
    }
}
