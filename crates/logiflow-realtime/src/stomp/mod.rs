//! STOMP 1.2 framing.
//!
//! Only the client-side subset the dashboards need: CONNECT, SEND,
//! SUBSCRIBE, UNSUBSCRIBE and DISCONNECT out; CONNECTED, MESSAGE, RECEIPT
//! and ERROR in.

pub mod frame;

pub use frame::{Command, Frame, decode_frames};

/// Heart-beat frame: a lone end-of-line.
pub const HEARTBEAT: &str = "\n";

/// Protocol version negotiated in `CONNECT`.
pub const ACCEPT_VERSION: &str = "1.2";
