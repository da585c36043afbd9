//! Realtime channel errors.

use logiflow_core::error::{AppError, ErrorKind};

/// Errors surfaced by [`RealtimeChannel`](crate::RealtimeChannel).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// No access token is available to authenticate the handshake.
    #[error("No authentication token available")]
    NoToken,

    /// The broker sent an `ERROR` frame or broke the STOMP handshake.
    #[error("STOMP error: {0}")]
    ProtocolError(String),

    /// A send was attempted while the channel was not connected.
    #[error("Cannot send to {0}: not connected")]
    SendWhileDisconnected(String),

    /// The WebSocket could not be opened or failed mid-session.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The broker did not complete the handshake in time.
    #[error("Timed out waiting for the realtime connection")]
    Timeout,
}

impl From<ChannelError> for AppError {
    fn from(e: ChannelError) -> Self {
        let kind = match &e {
            ChannelError::NoToken => ErrorKind::Authentication,
            ChannelError::ProtocolError(_) => ErrorKind::Protocol,
            ChannelError::Transport(_) | ChannelError::Timeout => ErrorKind::Network,
            ChannelError::SendWhileDisconnected(_) => ErrorKind::Realtime,
        };
        AppError::new(kind, e.to_string())
    }
}
