//! Topic subscriptions and their caller-held guards.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::driver::DriverCommand;
use crate::message::Message;

/// Callback invoked for each message on a topic, on the driver task.
pub type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

struct Entry {
    topic: String,
    handler: Handler,
}

/// Live caller subscriptions keyed by STOMP subscription id.
pub struct SubscriptionRegistry {
    entries: DashMap<String, Entry>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Allocate a fresh subscription id. Ids are never reused.
    pub fn next_id(&self) -> String {
        format!("sub-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Records a subscription and returns its id.
    pub fn add(&self, topic: impl Into<String>, handler: Handler) -> String {
        let id = self.next_id();
        self.entries.insert(
            id.clone(),
            Entry {
                topic: topic.into(),
                handler,
            },
        );
        id
    }

    /// Removes a subscription, returning its topic if it was live.
    pub fn remove(&self, id: &str) -> Option<String> {
        self.entries.remove(id).map(|(_, entry)| entry.topic)
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Handler for `id`, cloned out so the map is not locked while it runs.
    pub fn handler(&self, id: &str) -> Option<Handler> {
        self.entries.get(id).map(|entry| entry.handler.clone())
    }

    /// Handlers of every subscription on `topic`.
    pub fn handlers_for_topic(&self, topic: &str) -> Vec<Handler> {
        self.entries
            .iter()
            .filter(|entry| entry.topic == topic)
            .map(|entry| entry.handler.clone())
            .collect()
    }

    /// `(id, topic)` of every live subscription.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.topic.clone()))
            .collect()
    }

    /// Removes everything, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no subscription is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller handle for a topic subscription.
///
/// Dropping the guard or calling [`unsubscribe`](Self::unsubscribe) stops
/// delivery. A guard returned while the channel was not connected, or
/// whose connection has since been lost, is inert.
#[derive(Debug)]
pub struct Subscription {
    id: Option<String>,
    topic: String,
    registry: Option<Arc<SubscriptionRegistry>>,
    commands: Option<mpsc::UnboundedSender<DriverCommand>>,
}

impl Subscription {
    pub(crate) fn active(
        id: String,
        topic: String,
        registry: Arc<SubscriptionRegistry>,
        commands: mpsc::UnboundedSender<DriverCommand>,
    ) -> Self {
        Self {
            id: Some(id),
            topic,
            registry: Some(registry),
            commands: Some(commands),
        }
    }

    /// A guard that delivers nothing.
    pub fn inert(topic: impl Into<String>) -> Self {
        Self {
            id: None,
            topic: topic.into(),
            registry: None,
            commands: None,
        }
    }

    /// STOMP subscription id, if the subscription was ever registered.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Subscribed destination.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether messages are still being delivered.
    pub fn is_active(&self) -> bool {
        match (&self.id, &self.registry) {
            (Some(id), Some(registry)) => registry.contains(id),
            _ => false,
        }
    }

    /// Stop delivery now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let (Some(id), Some(registry)) = (self.id.take(), self.registry.take()) else {
            return;
        };
        if let Some(topic) = registry.remove(&id) {
            if let Some(commands) = self.commands.take() {
                let _ = commands.send(DriverCommand::Unsubscribe { id, topic });
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Arc::new(|_: &Message| {})
    }

    #[test]
    fn test_registry_add_remove() {
        let registry = SubscriptionRegistry::new();
        let a = registry.add("/topic/pedidos", noop());
        let b = registry.add("/topic/pedidos", noop());
        assert_ne!(a, b);
        assert_eq!(registry.handlers_for_topic("/topic/pedidos").len(), 2);

        assert_eq!(registry.remove(&a).as_deref(), Some("/topic/pedidos"));
        assert_eq!(registry.remove(&a), None);
        assert_eq!(registry.clear(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_guard_unsubscribes_once() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = registry.add("/topic/tracking", noop());

        let guard = Subscription::active(id.clone(), "/topic/tracking".into(), registry.clone(), tx);
        assert!(guard.is_active());
        guard.unsubscribe();

        assert!(!registry.contains(&id));
        match rx.try_recv() {
            Ok(DriverCommand::Unsubscribe { id: sent, .. }) => assert_eq!(sent, id),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_guard_after_clear_is_inert() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = registry.add("/topic/pedidos", noop());
        let guard = Subscription::active(id, "/topic/pedidos".into(), registry.clone(), tx);

        registry.clear();
        assert!(!guard.is_active());
        drop(guard);
        assert!(rx.try_recv().is_err());

        let inert = Subscription::inert("/topic/pedidos");
        assert!(!inert.is_active());
        assert_eq!(inert.id(), None);
    }
}
