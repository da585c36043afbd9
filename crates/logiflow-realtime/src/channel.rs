//! The reconnecting realtime channel handle.
//!
//! A [`RealtimeChannel`] owns at most one driver task. The handle is cheap
//! to clone; every clone controls the same connection.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use logiflow_core::config::RealtimeConfig;
use logiflow_core::traits::TokenProvider;

use crate::driver::{self, DriverCommand, Shared};
use crate::error::ChannelError;
use crate::message::Message;
use crate::state::{ChannelEvent, ChannelState};
use crate::subscription::{Handler, Subscription, SubscriptionRegistry};
use crate::transport::{Transport, WsTransport};

/// Upper bound for the driver to finish a graceful DISCONNECT.
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(2);

/// Lifecycle callbacks, invoked on the driver task.
///
/// Every method has a no-op default so implementors pick what they need.
pub trait ChannelEvents: Send + Sync + std::fmt::Debug + 'static {
    /// The STOMP handshake completed and configured topics are subscribed.
    fn on_connect(&self) {}

    /// An established connection closed or was lost.
    fn on_disconnect(&self) {}

    /// A connection attempt or session failed.
    fn on_error(&self, _error: &ChannelError) {}

    /// A message arrived on one of the configured topics.
    fn on_message(&self, _topic: &str, _message: &Message) {}
}

/// Callbacks that ignore everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl ChannelEvents for NoopEvents {}

struct Driver {
    commands: mpsc::UnboundedSender<DriverCommand>,
    task: JoinHandle<()>,
}

struct Inner {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl Inner {
    fn driver(&self) -> std::sync::MutexGuard<'_, Option<Driver>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(driver) = self.driver().take() {
            driver.task.abort();
        }
    }
}

/// Builder for [`RealtimeChannel`].
pub struct ChannelBuilder {
    config: RealtimeConfig,
    tokens: Arc<dyn TokenProvider>,
    transport: Arc<dyn Transport>,
    events: Arc<dyn ChannelEvents>,
}

impl std::fmt::Debug for ChannelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBuilder")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .finish()
    }
}

impl ChannelBuilder {
    /// Use a different transport (tests, proxies).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Install lifecycle callbacks.
    pub fn events(mut self, events: Arc<dyn ChannelEvents>) -> Self {
        self.events = events;
        self
    }

    /// Replace the topics subscribed on every handshake.
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Build an idle channel. Nothing connects until [`RealtimeChannel::connect`].
    pub fn build(self) -> RealtimeChannel {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        RealtimeChannel {
            inner: Arc::new(Inner {
                shared: Arc::new(Shared {
                    config: self.config,
                    tokens: self.tokens,
                    transport: self.transport,
                    events: self.events,
                    state,
                    subscriptions: Arc::new(SubscriptionRegistry::new()),
                }),
                driver: Mutex::new(None),
            }),
        }
    }
}

/// Authenticated STOMP channel to the LogiFlow realtime service.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("shared", &self.inner.shared)
            .finish()
    }
}

impl RealtimeChannel {
    /// Start building a channel that authenticates with `tokens`.
    pub fn builder(config: RealtimeConfig, tokens: Arc<dyn TokenProvider>) -> ChannelBuilder {
        ChannelBuilder {
            config,
            tokens,
            transport: Arc::new(WsTransport::new()),
            events: Arc::new(NoopEvents),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ChannelState {
        self.inner.shared.current()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.shared.state.subscribe()
    }

    /// Whether subscribe and send are currently allowed.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Start connecting in the background.
    ///
    /// A no-op while connecting or connected. Fails with
    /// [`ChannelError::NoToken`] when no session token exists; the state is
    /// left untouched in that case. Must be called inside a Tokio runtime.
    pub fn connect(&self) -> Result<(), ChannelError> {
        let shared = &self.inner.shared;
        let mut slot = self.inner.driver();
        if shared.current().is_active() {
            debug!(state = %shared.current(), "Connect ignored: channel already active");
            return Ok(());
        }

        let Some(token) = shared.tokens.access_token() else {
            shared.report(&ChannelError::NoToken);
            return Err(ChannelError::NoToken);
        };

        if let Some(stale) = slot.take() {
            stale.task.abort();
        }

        shared.apply(ChannelEvent::ConnectRequested);
        info!(url = %shared.config.url, "Connecting realtime channel");

        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(driver::run(shared.clone(), rx, token));
        *slot = Some(Driver { commands, task });
        Ok(())
    }

    /// Subscribe `handler` to `topic`.
    ///
    /// Only succeeds while connected; otherwise the error is logged and an
    /// inert guard is returned. Subscriptions do not survive a reconnect.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let shared = &self.inner.shared;
        let commands = match self.inner.driver().as_ref() {
            Some(driver) if shared.current().is_connected() => driver.commands.clone(),
            _ => {
                error!(topic = %topic, state = %shared.current(), "Cannot subscribe: not connected");
                return Subscription::inert(topic);
            }
        };

        let handler: Handler = Arc::new(handler);
        let id = shared.subscriptions.add(topic.clone(), handler);
        if commands
            .send(DriverCommand::Subscribe {
                id: id.clone(),
                topic: topic.clone(),
            })
            .is_err()
        {
            shared.subscriptions.remove(&id);
            warn!(topic = %topic, "Cannot subscribe: driver stopped");
            return Subscription::inert(topic);
        }
        debug!(id = %id, topic = %topic, "Subscription registered");
        Subscription::active(id, topic, shared.subscriptions.clone(), commands)
    }

    /// Connect if needed, wait for the handshake, then subscribe.
    ///
    /// Waits at most the configured connect timeout.
    pub async fn subscribe_when_connected<F>(
        &self,
        topic: impl Into<String>,
        handler: F,
    ) -> Result<Subscription, ChannelError>
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let mut state = self.watch_state();
        self.connect()?;

        let wait = self.inner.shared.config.connect_timeout();
        match tokio::time::timeout(wait, state.wait_for(ChannelState::is_connected)).await {
            Ok(Ok(_)) => Ok(self.subscribe(topic, handler)),
            Ok(Err(_)) | Err(_) => Err(ChannelError::Timeout),
        }
    }

    /// Publish `body` as JSON to `destination`.
    ///
    /// Dropped with an error log when not connected.
    pub fn send_message<T: Serialize + ?Sized>(&self, destination: &str, body: &T) {
        let shared = &self.inner.shared;
        let commands = match self.inner.driver().as_ref() {
            Some(driver) if shared.current().is_connected() => driver.commands.clone(),
            _ => {
                error!(
                    error = %ChannelError::SendWhileDisconnected(destination.to_string()),
                    "Dropping message"
                );
                return;
            }
        };

        let body = match serde_json::to_string(body) {
            Ok(body) => body,
            Err(e) => {
                error!(destination = %destination, error = %e, "Failed to serialize message");
                return;
            }
        };
        let _ = commands.send(DriverCommand::Send {
            destination: destination.to_string(),
            body,
        });
    }

    /// Close the connection and stop reconnecting. Idempotent.
    pub async fn disconnect(&self) {
        let driver = self.inner.driver().take();
        let shared = &self.inner.shared;

        if let Some(Driver { commands, mut task }) = driver {
            let _ = commands.send(DriverCommand::Disconnect);
            drop(commands);
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("Realtime driver did not stop in time, aborting");
                task.abort();
            }
        }

        shared.subscriptions.clear();
        shared.apply(ChannelEvent::DisconnectRequested);
    }
}
