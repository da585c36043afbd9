//! The per-channel driver task.
//!
//! Owns the transport. Runs connect, handshake and the connected session,
//! then waits the reconnect delay and starts over until told to stop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use logiflow_core::config::RealtimeConfig;
use logiflow_core::traits::TokenProvider;

use crate::channel::ChannelEvents;
use crate::error::ChannelError;
use crate::heartbeat::{Heartbeat, Liveness};
use crate::message::Message;
use crate::state::{ChannelEvent, ChannelState};
use crate::stomp::{ACCEPT_VERSION, Command, Frame, HEARTBEAT, decode_frames};
use crate::subscription::SubscriptionRegistry;
use crate::transport::{Connection, Transport};

/// Requests from the public API to the driver.
#[derive(Debug)]
pub(crate) enum DriverCommand {
    /// Send SUBSCRIBE for an entry already in the registry.
    Subscribe { id: String, topic: String },
    /// Send UNSUBSCRIBE; the registry entry is already gone.
    Unsubscribe { id: String, topic: String },
    /// Publish a JSON body.
    Send { destination: String, body: String },
    /// Close and stop reconnecting.
    Disconnect,
}

/// State shared between the channel handle and its driver.
pub(crate) struct Shared {
    pub(crate) config: RealtimeConfig,
    pub(crate) tokens: Arc<dyn TokenProvider>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) events: Arc<dyn ChannelEvents>,
    pub(crate) state: watch::Sender<ChannelState>,
    pub(crate) subscriptions: Arc<SubscriptionRegistry>,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("url", &self.config.url)
            .field("state", &*self.state.borrow())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl Shared {
    /// Feed an event through the state machine and publish the result.
    pub(crate) fn apply(&self, event: ChannelEvent) -> ChannelState {
        let mut next = ChannelState::Disconnected;
        self.state.send_if_modified(|state| {
            let previous = *state;
            *state = state.transition(event);
            next = *state;
            if previous != next {
                debug!(from = %previous, to = %next, ?event, "Channel state changed");
            }
            previous != next
        });
        next
    }

    pub(crate) fn current(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Log an error and hand it to the error callback.
    pub(crate) fn report(&self, error: &ChannelError) {
        warn!(url = %self.config.url, error = %error, "Realtime channel error");
        self.events.on_error(error);
    }

    /// Drop every caller subscription.
    fn release_subscriptions(&self) {
        let released = self.subscriptions.clear();
        if released > 0 {
            debug!(count = released, "Released subscriptions");
        }
    }
}

/// How a single connection attempt ended.
enum SessionEnd {
    /// `disconnect()` or the channel was dropped.
    Stopped { was_connected: bool },
    /// A connected session lost its transport.
    Lost,
    /// The attempt failed; apply `event` and report `error`.
    Failed {
        error: ChannelError,
        event: ChannelEvent,
    },
}

/// Driver entry point. `token` is the token read by `connect()`.
pub(crate) async fn run(
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<DriverCommand>,
    mut token: String,
) {
    loop {
        match run_session(&shared, &mut commands, &token).await {
            SessionEnd::Stopped { was_connected } => {
                stop(&shared, was_connected);
                return;
            }
            SessionEnd::Lost => {
                shared.apply(ChannelEvent::TransportClosed);
                shared.release_subscriptions();
                info!(url = %shared.config.url, "Realtime connection lost");
                shared.events.on_disconnect();
            }
            SessionEnd::Failed { error, event } => {
                shared.apply(event);
                shared.release_subscriptions();
                shared.report(&error);
            }
        }

        let delay = shared.config.reconnect_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = wait_for_stop(&shared, &mut commands) => {
                stop(&shared, false);
                return;
            }
        }

        match shared.tokens.access_token() {
            Some(fresh) => token = fresh,
            None => {
                shared.report(&ChannelError::NoToken);
                stop(&shared, false);
                return;
            }
        }
        shared.apply(ChannelEvent::ConnectRequested);
    }
}

fn stop(shared: &Shared, was_connected: bool) {
    shared.apply(ChannelEvent::DisconnectRequested);
    shared.release_subscriptions();
    if was_connected {
        info!(url = %shared.config.url, "Realtime channel disconnected");
        shared.events.on_disconnect();
    }
}

/// Drain commands while no session is up; resolves on a stop request.
async fn wait_for_stop(shared: &Shared, commands: &mut mpsc::UnboundedReceiver<DriverCommand>) {
    while let Some(command) = commands.recv().await {
        match command {
            DriverCommand::Disconnect => return,
            DriverCommand::Subscribe { id, topic } => {
                shared.subscriptions.remove(&id);
                error!(topic = %topic, "Cannot subscribe: not connected");
            }
            DriverCommand::Send { destination, .. } => {
                error!(error = %ChannelError::SendWhileDisconnected(destination), "Dropping message");
            }
            DriverCommand::Unsubscribe { .. } => {}
        }
    }
}

async fn run_session(
    shared: &Shared,
    commands: &mut mpsc::UnboundedReceiver<DriverCommand>,
    token: &str,
) -> SessionEnd {
    let config = &shared.config;

    let opened = tokio::select! {
        opened = time::timeout(config.connect_timeout(), shared.transport.connect(&config.url, token)) => opened,
        _ = wait_for_stop(shared, commands) => return SessionEnd::Stopped { was_connected: false },
    };
    let mut conn = match opened {
        Ok(Ok(conn)) => conn,
        Ok(Err(error)) => {
            return SessionEnd::Failed {
                error,
                event: ChannelEvent::TransportFailed,
            };
        }
        Err(_) => {
            return SessionEnd::Failed {
                error: ChannelError::Timeout,
                event: ChannelEvent::TransportFailed,
            };
        }
    };

    let heartbeat = match handshake(shared, commands, conn.as_mut(), token).await {
        Ok(heartbeat) => heartbeat,
        Err(end) => {
            conn.close().await;
            return end;
        }
    };

    shared.apply(ChannelEvent::HandshakeCompleted);
    info!(url = %config.url, ?heartbeat, "Realtime channel connected");

    let mut topic_subscriptions = HashMap::new();
    for topic in &config.topics {
        let id = shared.subscriptions.next_id();
        if let Err(error) = conn.send(subscribe_frame(&id, topic).encode()).await {
            warn!(topic = %topic, error = %error, "Configured subscription failed");
            conn.close().await;
            return SessionEnd::Lost;
        }
        topic_subscriptions.insert(id, topic.clone());
    }
    shared.events.on_connect();

    let end = connected(shared, commands, conn.as_mut(), heartbeat, &topic_subscriptions).await;
    conn.close().await;
    end
}

/// Send CONNECT and wait for CONNECTED.
async fn handshake(
    shared: &Shared,
    commands: &mut mpsc::UnboundedReceiver<DriverCommand>,
    conn: &mut dyn Connection,
    token: &str,
) -> Result<Heartbeat, SessionEnd> {
    let config = &shared.config;
    let connect = Frame::new(Command::Connect)
        .header("accept-version", ACCEPT_VERSION)
        .header("Authorization", format!("Bearer {token}"))
        .header(
            "heart-beat",
            Heartbeat::header(config.heartbeat_outgoing_ms, config.heartbeat_incoming_ms),
        );
    conn.send(connect.encode()).await.map_err(|error| SessionEnd::Failed {
        error,
        event: ChannelEvent::TransportFailed,
    })?;

    let deadline = Instant::now() + config.connect_timeout();
    loop {
        tokio::select! {
            incoming = conn.recv() => {
                let text = match incoming {
                    Some(Ok(text)) => text,
                    Some(Err(error)) => {
                        return Err(SessionEnd::Failed { error, event: ChannelEvent::TransportFailed });
                    }
                    None => {
                        return Err(SessionEnd::Failed {
                            error: ChannelError::ProtocolError("Connection closed during STOMP handshake".into()),
                            event: ChannelEvent::ProtocolFailed,
                        });
                    }
                };
                let frames = decode_frames(&text).map_err(|error| SessionEnd::Failed {
                    error,
                    event: ChannelEvent::ProtocolFailed,
                })?;
                for frame in frames {
                    match frame.command {
                        Command::Connected => {
                            return Ok(Heartbeat::negotiate(
                                config.heartbeat_outgoing_ms,
                                config.heartbeat_incoming_ms,
                                frame.get("heart-beat"),
                            ));
                        }
                        Command::Error => {
                            return Err(SessionEnd::Failed {
                                error: error_frame(&frame),
                                event: ChannelEvent::ProtocolFailed,
                            });
                        }
                        other => debug!(command = %other, "Ignoring frame before CONNECTED"),
                    }
                }
            }
            _ = time::sleep_until(deadline) => {
                return Err(SessionEnd::Failed { error: ChannelError::Timeout, event: ChannelEvent::ProtocolFailed });
            }
            _ = wait_for_stop(shared, commands) => {
                return Err(SessionEnd::Stopped { was_connected: false });
            }
        }
    }
}

/// The connected loop: inbound frames, caller commands, heart-beats.
async fn connected(
    shared: &Shared,
    commands: &mut mpsc::UnboundedReceiver<DriverCommand>,
    conn: &mut dyn Connection,
    heartbeat: Heartbeat,
    topic_subscriptions: &HashMap<String, String>,
) -> SessionEnd {
    let mut liveness = Liveness::new(&heartbeat);
    let beat_every = heartbeat.outgoing.unwrap_or(time::Duration::from_secs(3600));
    let mut beats = time::interval_at(Instant::now() + beat_every, beat_every);
    beats.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let deadline = liveness.deadline();
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Some(Ok(text)) => {
                    liveness.touch();
                    match decode_frames(&text) {
                        Ok(frames) => {
                            if let Some(end) = frames
                                .into_iter()
                                .find_map(|frame| dispatch(shared, frame, topic_subscriptions))
                            {
                                return end;
                            }
                        }
                        Err(error) => warn!(error = %error, "Dropping undecodable frame"),
                    }
                }
                Some(Err(error)) => {
                    warn!(error = %error, "Realtime transport failed");
                    return SessionEnd::Lost;
                }
                None => {
                    debug!("Broker closed the connection");
                    return SessionEnd::Lost;
                }
            },
            command = commands.recv() => {
                let frame = match command {
                    Some(DriverCommand::Subscribe { id, topic }) => {
                        if !shared.subscriptions.contains(&id) {
                            continue;
                        }
                        debug!(id = %id, topic = %topic, "Subscribing");
                        subscribe_frame(&id, &topic)
                    }
                    Some(DriverCommand::Unsubscribe { id, topic }) => {
                        debug!(id = %id, topic = %topic, "Unsubscribing");
                        Frame::new(Command::Unsubscribe).header("id", id)
                    }
                    Some(DriverCommand::Send { destination, body }) => Frame::new(Command::Send)
                        .header("destination", destination)
                        .header("content-type", "application/json")
                        .with_body(body),
                    Some(DriverCommand::Disconnect) | None => {
                        let _ = conn.send(Frame::new(Command::Disconnect).encode()).await;
                        return SessionEnd::Stopped { was_connected: true };
                    }
                };
                if let Err(error) = conn.send(frame.encode()).await {
                    warn!(error = %error, "Realtime write failed");
                    return SessionEnd::Lost;
                }
            }
            _ = beats.tick(), if heartbeat.outgoing.is_some() => {
                if let Err(error) = conn.send(HEARTBEAT.to_string()).await {
                    warn!(error = %error, "Heart-beat write failed");
                    return SessionEnd::Lost;
                }
            }
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                warn!(
                    silent_ms = heartbeat.dead_after().map(|d| d.as_millis() as u64),
                    "No heart-beat from broker, dropping connection"
                );
                return SessionEnd::Lost;
            }
        }
    }
}

/// Route one inbound frame. Returns an end state for ERROR frames.
fn dispatch(
    shared: &Shared,
    frame: Frame,
    topic_subscriptions: &HashMap<String, String>,
) -> Option<SessionEnd> {
    match frame.command {
        Command::Message => {
            let message = Message::parse(&frame.body);
            let destination = frame.get("destination").unwrap_or_default();
            match frame.get("subscription") {
                Some(id) if topic_subscriptions.contains_key(id) => {
                    shared.events.on_message(&topic_subscriptions[id], &message);
                }
                Some(id) => match shared.subscriptions.handler(id) {
                    Some(handler) => handler(&message),
                    None => debug!(id = %id, destination = %destination, "Message for released subscription"),
                },
                None => {
                    for handler in shared.subscriptions.handlers_for_topic(destination) {
                        handler(&message);
                    }
                }
            }
            None
        }
        Command::Error => Some(SessionEnd::Failed {
            error: error_frame(&frame),
            event: ChannelEvent::ProtocolFailed,
        }),
        other => {
            debug!(command = %other, "Ignoring frame");
            None
        }
    }
}

fn subscribe_frame(id: &str, topic: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", topic)
        .header("ack", "auto")
}

fn error_frame(frame: &Frame) -> ChannelError {
    let message = frame
        .get("message")
        .map(str::to_string)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if frame.body.is_empty() {
                "STOMP error".to_string()
            } else {
                frame.body.clone()
            }
        });
    ChannelError::ProtocolError(message)
}
