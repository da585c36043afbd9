//! Channel connection state machine.

use std::fmt;

/// Connection state observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Idle, closed, or lost.
    #[default]
    Disconnected,
    /// Transport or STOMP handshake in progress.
    Connecting,
    /// `CONNECTED` received; subscribe and send are allowed.
    Connected,
    /// The last attempt failed; a retry may be pending.
    Error,
}

/// Inputs that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// `connect()` or a scheduled reconnect attempt.
    ConnectRequested,
    /// The broker answered `CONNECTED`.
    HandshakeCompleted,
    /// An `ERROR` frame, a broken handshake, or a handshake timeout.
    ProtocolFailed,
    /// The transport could not be opened.
    TransportFailed,
    /// The transport closed or went silent past the heart-beat window.
    TransportClosed,
    /// `disconnect()`.
    DisconnectRequested,
}

impl ChannelState {
    /// Next state for `event`. Events that do not apply leave the state as is.
    pub fn transition(self, event: ChannelEvent) -> Self {
        use ChannelEvent as E;
        use ChannelState as S;

        match (self, event) {
            (_, E::DisconnectRequested) => S::Disconnected,
            (S::Disconnected | S::Error, E::ConnectRequested) => S::Connecting,
            (S::Connecting, E::HandshakeCompleted) => S::Connected,
            (S::Connecting | S::Connected, E::ProtocolFailed) => S::Error,
            (S::Connecting, E::TransportFailed) => S::Error,
            (S::Connecting | S::Connected, E::TransportClosed) => S::Disconnected,
            (state, _) => state,
        }
    }

    /// Whether subscribe and send are allowed.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether a connection is up or being established.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connected | Self::Connecting)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}
