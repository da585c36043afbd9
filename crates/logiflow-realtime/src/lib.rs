//! # logiflow-realtime
//!
//! Client side of the LogiFlow realtime service: a STOMP 1.2 session over a
//! WebSocket that reconnects on loss, keeps heart-beats, and dispatches
//! topic messages to subscribers in receipt order.
//!
//! Messages are change signals; dashboards re-fetch state when one arrives.

pub mod channel;
mod driver;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod state;
pub mod stomp;
pub mod subscription;
pub mod topics;
pub mod transport;

pub use channel::{ChannelBuilder, ChannelEvents, NoopEvents, RealtimeChannel};
pub use error::ChannelError;
pub use message::Message;
pub use state::{ChannelEvent, ChannelState};
pub use subscription::Subscription;
pub use transport::{Connection, Transport, WsTransport};
