//! STOMP heart-beat negotiation and liveness tracking.

use std::time::Duration;

use tokio::time::Instant;

/// Inbound silence tolerated, as a multiple of the negotiated interval.
const DEAD_AFTER_FACTOR: u32 = 2;

/// Negotiated heart-beat intervals for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    /// How often the client writes an EOL; `None` disables it.
    pub outgoing: Option<Duration>,
    /// How often the broker promised to send something; `None` disables
    /// the liveness check.
    pub incoming: Option<Duration>,
}

impl Heartbeat {
    /// `heart-beat` header value for CONNECT.
    pub fn header(outgoing_ms: u64, incoming_ms: u64) -> String {
        format!("{outgoing_ms},{incoming_ms}")
    }

    /// Combine the client's wish with the broker's `heart-beat` reply.
    ///
    /// Each direction runs at the slower of the two sides and is off when
    /// either side sends 0. A missing or malformed reply disables both.
    pub fn negotiate(client_outgoing_ms: u64, client_incoming_ms: u64, server: Option<&str>) -> Self {
        let (server_outgoing, server_incoming) = server
            .and_then(|value| {
                let (sx, sy) = value.split_once(',')?;
                Some((sx.trim().parse::<u64>().ok()?, sy.trim().parse::<u64>().ok()?))
            })
            .unwrap_or((0, 0));

        Self {
            outgoing: pick(client_outgoing_ms, server_incoming),
            incoming: pick(client_incoming_ms, server_outgoing),
        }
    }

    /// Inbound silence after which the connection counts as lost.
    pub fn dead_after(&self) -> Option<Duration> {
        self.incoming.map(|d| d * DEAD_AFTER_FACTOR)
    }
}

fn pick(ours: u64, theirs: u64) -> Option<Duration> {
    if ours == 0 || theirs == 0 {
        None
    } else {
        Some(Duration::from_millis(ours.max(theirs)))
    }
}

/// Tracks when the broker last sent anything.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    last_inbound: Instant,
    dead_after: Option<Duration>,
}

impl Liveness {
    /// Start tracking now.
    pub fn new(heartbeat: &Heartbeat) -> Self {
        Self {
            last_inbound: Instant::now(),
            dead_after: heartbeat.dead_after(),
        }
    }

    /// Record inbound traffic.
    pub fn touch(&mut self) {
        self.last_inbound = Instant::now();
    }

    /// When the connection will be declared dead, if checking is enabled.
    pub fn deadline(&self) -> Option<Instant> {
        self.dead_after.map(|d| self.last_inbound + d)
    }
}
