//! Connection kernel: drives the `rumqttc` event loop.
//!
//! ```text
//! Publisher (AsyncClient::publish)
//!     ↓ request channel
//! ConnectionKernel (polls EventLoop, reconnects, reports state)
//!     ↓
//! Broker (TCP)
//! ```
//!
//! `rumqttc` only makes progress while the event loop is polled, so the kernel
//! must run for as long as the application publishes. Transient failures are
//! retried after a fixed delay; fatal ones (rejected credentials, protocol
//! violations) stop the kernel and are reported on the state channel.

use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Packet};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{error::TransferError, state::ConnectionState};

pub struct ConnectionKernel {
    client: AsyncClient,
    event_loop: EventLoop,
    reconnect_delay: Duration,
    cancel: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionKernel {
    pub fn new(
        client: AsyncClient,
        event_loop: EventLoop,
        reconnect_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            client,
            event_loop,
            reconnect_delay,
            cancel,
            state_tx,
        }
    }

    /// Receiver observing every state transition. The current state is
    /// visible immediately.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn update_state(&self, state: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
        if changed {
            info!("Connection state changed to: {}", state);
        }
    }

    /// Runs until cancellation (`Ok`) or a fatal connection error (`Err`).
    pub async fn run(mut self) -> Result<(), TransferError> {
        self.update_state(ConnectionState::Connecting);
        info!("Starting connection event loop...");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!("Shutdown signal received, disconnecting...");
                    self.shutdown().await;
                    self.update_state(ConnectionState::Stopped);
                    return Ok(());
                }

                event_result = self.event_loop.poll() => {
                    match event_result {
                        Ok(event) => self.handle_event(event),
                        Err(e) => {
                            if is_fatal_error(&e) {
                                error!("Fatal connection error: {}", get_error_message(&e));
                                self.update_state(ConnectionState::Failed(e.to_string()));
                                return Err(TransferError::from(e));
                            }

                            warn!(
                                "Reconnecting in {}s due to error: {}",
                                self.reconnect_delay.as_secs(),
                                get_error_message(&e)
                            );
                            self.update_state(ConnectionState::Reconnecting(self.reconnect_delay.as_secs()));

                            tokio::select! {
                                _ = self.cancel.cancelled() => {}
                                _ = tokio::time::sleep(self.reconnect_delay) => {
                                    self.update_state(ConnectionState::Connecting);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn handle_event(&self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(conn_ack)) => {
                if conn_ack.code == ConnectReturnCode::Success {
                    info!("Connection established successfully.");
                    self.update_state(ConnectionState::Connected);
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Disconnected by broker");
                self.update_state(ConnectionState::Reconnecting(self.reconnect_delay.as_secs()));
            }
            Event::Incoming(packet) => trace!("Incoming packet: {:?}", packet),
            Event::Outgoing(outgoing) => trace!("Outgoing packet: {:?}", outgoing),
        }
    }

    /// Sends DISCONNECT and keeps polling briefly so the packet leaves the
    /// socket. A clean disconnect suppresses the last will.
    async fn shutdown(&mut self) {
        if let Err(e) = self.client.try_disconnect() {
            warn!("Error queueing disconnect packet: {:?}", e);
            return;
        }

        let flush = async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
        };
        if tokio::time::timeout(Duration::from_secs(2), flush).await.is_err() {
            debug!("Timed out flushing DISCONNECT");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Fatal,
    Reconnect,
}

fn classify_connection_error(err: &ConnectionError) -> Disposition {
    use Disposition::*;

    match err {
        ConnectionError::MqttState(_) => Fatal,
        ConnectionError::NotConnAck(_) => Fatal,
        ConnectionError::RequestsDone => Fatal,

        ConnectionError::Io(e) => match e.kind() {
            std::io::ErrorKind::AddrInUse
            | std::io::ErrorKind::PermissionDenied
            | std::io::ErrorKind::InvalidInput
            | std::io::ErrorKind::InvalidData => Fatal,
            _ => Reconnect,
        },

        ConnectionError::NetworkTimeout | ConnectionError::FlushTimeout => Reconnect,

        ConnectionError::ConnectionRefused(code) => match code {
            ConnectReturnCode::RefusedProtocolVersion
            | ConnectReturnCode::BadClientId
            | ConnectReturnCode::BadUserNamePassword
            | ConnectReturnCode::NotAuthorized => Fatal,
            _ => Reconnect,
        },

        #[allow(unreachable_patterns)]
        _ => Reconnect,
    }
}

fn is_fatal_error(err: &ConnectionError) -> bool {
    matches!(classify_connection_error(err), Disposition::Fatal)
}

/// Innermost message of an error chain, without surrounding quotes.
fn get_error_message(e: &dyn std::error::Error) -> String {
    let mut current = e;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{client::ClientBuilder, config::Config};

    fn kernel(cancel: CancellationToken) -> ConnectionKernel {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 1,
            client_id: "kernel_test".into(),
            ..Default::default()
        };
        let (client, event_loop) = ClientBuilder::from_config(&config).unwrap().build();
        ConnectionKernel::new(client, event_loop, Duration::from_secs(1), cancel)
    }

    #[test]
    fn test_io_error_classification() {
        let refused = ConnectionError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "x"));
        assert!(!is_fatal_error(&refused));

        let denied = ConnectionError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "x"));
        assert!(is_fatal_error(&denied));
    }

    #[test]
    fn test_refused_codes_classification() {
        assert!(is_fatal_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::BadUserNamePassword
        )));
        assert!(is_fatal_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::NotAuthorized
        )));
        assert!(!is_fatal_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::ServiceUnavailable
        )));
        assert!(!is_fatal_error(&ConnectionError::NetworkTimeout));
    }

    #[test]
    fn test_error_message_unwraps_chain() {
        let err = io::Error::new(io::ErrorKind::Other, "\"boom\"");
        assert_eq!(get_error_message(&err), "boom");
    }

    #[tokio::test]
    async fn test_state_subscription_starts_connecting() {
        let kernel = kernel(CancellationToken::new());
        let rx = kernel.subscribe_state();
        assert_eq!(*rx.borrow(), ConnectionState::Connecting);

        kernel.update_state(ConnectionState::Connected);
        assert_eq!(*rx.borrow(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_unreachable_broker_reports_reconnecting() {
        let cancel = CancellationToken::new();
        let kernel = kernel(cancel.clone());
        let mut rx = kernel.subscribe_state();
        let handle = tokio::spawn(kernel.run());

        let reconnecting = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| matches!(s, ConnectionState::Reconnecting(_))),
        )
        .await
        .is_ok_and(|r| r.is_ok());
        assert!(reconnecting);

        cancel.cancel();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(*rx.borrow(), ConnectionState::Stopped);
    }
}
