//! Observable connection state.
//!
//! The connection kernel publishes every transition on a `watch` channel so
//! the application can log outages or wait for the first successful
//! handshake before announcing itself.

use std::fmt;

/// Lifecycle of the broker connection.
///
/// `Connecting` -> `Connected` -> `Reconnecting` -> `Connecting` -> ... until
/// either a fatal error (`Failed`) or a shutdown request (`Stopped`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// CONNECT sent, waiting for CONNACK.
    Connecting,

    /// Handshake accepted by the broker.
    Connected,

    /// Connection lost; the next attempt happens after the given number of seconds.
    Reconnecting(u64),

    /// Unrecoverable error (bad credentials, protocol violation).
    Failed(String),

    /// Clean shutdown after cancellation.
    Stopped,
}

impl ConnectionState {
    /// Short identifier, suitable for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting(_) => "Reconnecting",
            ConnectionState::Failed(_) => "Failed",
            ConnectionState::Stopped => "Stopped",
        }
    }

    /// Contextual details, empty for states that carry none.
    pub fn details(&self) -> String {
        match self {
            ConnectionState::Reconnecting(secs) => format!("in {secs} seconds"),
            ConnectionState::Failed(reason) => reason.clone(),
            _ => String::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True once the kernel has exited and no further transitions will follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed(_) | ConnectionState::Stopped)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())?;
        let details = self.details();
        if !details.is_empty() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}
