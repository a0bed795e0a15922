//! Entry point of the transport: builds the client, spawns the connection
//! kernel and hands out a cloneable [`MqttInstance`].
//!
//! ```ignore
//! let instance = MqttManager::from_config(config)?.build_and_start().await?;
//! instance.wait_connected().await?;
//! let publisher = Publisher::new(Arc::new(instance.clone()), 0)?;
//! publisher.publish("a/b", &payload, false).await?;
//! instance.shutdown().await;
//! ```

use std::time::Duration;

use rumqttc::AsyncClient;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use validator::Validate;

use super::{
    client::ClientBuilder, config::Config, connection::ConnectionKernel, error::TransferError,
    state::ConnectionState,
};

pub struct MqttManager {
    config: Config,
    cancel_token: CancellationToken,
}

impl MqttManager {
    /// Validates `config` and prepares a manager. Nothing touches the network yet.
    pub fn from_config(config: Config) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Builds the client and spawns the connection kernel on the current runtime.
    pub async fn build_and_start(self) -> Result<MqttInstance, TransferError> {
        info!(
            "Building MQTT client for {}:{}",
            self.config.host, self.config.port
        );

        let (client, event_loop) = ClientBuilder::from_config(&self.config)?.build();
        let kernel = ConnectionKernel::new(
            client.clone(),
            event_loop,
            Duration::from_secs(self.config.reconnect_delay),
            self.cancel_token.clone(),
        );
        let state_rx = kernel.subscribe_state();

        tokio::spawn(async move {
            if let Err(e) = kernel.run().await {
                error!("MQTT connection kernel exited with error: {}", e);
            }
        });

        Ok(MqttInstance {
            client,
            state_rx,
            cancel_token: self.cancel_token,
        })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

/// Handle to a running connection.
#[derive(Debug, Clone)]
pub struct MqttInstance {
    client: AsyncClient,
    state_rx: watch::Receiver<ConnectionState>,
    cancel_token: CancellationToken,
}

impl MqttInstance {
    pub fn client(&self) -> &AsyncClient {
        &self.client
    }

    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Waits for the first successful handshake.
    ///
    /// Fails if the kernel stops before ever connecting.
    pub async fn wait_connected(&self) -> Result<(), TransferError> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|s| s.is_connected() || s.is_terminal())
            .await
            .map_err(|_| TransferError::Shutdown)?
            .clone();

        match state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Failed(reason) => Err(TransferError::ClientSetup(reason)),
            _ => Err(TransferError::Shutdown),
        }
    }

    /// Resolves with the current state as soon as the connection is not up.
    ///
    /// Returns immediately while still connecting or after an outage.
    pub async fn disconnected(&self) -> ConnectionState {
        let mut rx = self.state_rx.clone();
        let result = match rx.wait_for(|s| !s.is_connected()).await {
            Ok(state) => state.clone(),
            Err(_) => ConnectionState::Stopped,
        };
        result
    }

    /// Resolves with the terminal state once the kernel has exited.
    pub async fn closed(&self) -> ConnectionState {
        let mut rx = self.state_rx.clone();
        let result = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(state) => state.clone(),
            Err(_) => ConnectionState::Stopped,
        };
        result
    }

    /// Requests a clean DISCONNECT and waits (bounded) for the kernel to stop.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        if tokio::time::timeout(Duration::from_secs(3), self.closed())
            .await
            .is_err()
        {
            debug!("MQTT kernel did not stop in time");
        }
    }
}
