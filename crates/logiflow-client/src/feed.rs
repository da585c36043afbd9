//! Live order list kept fresh by realtime signals.
//!
//! Realtime messages carry no state the dashboards trust: each one only
//! triggers a re-fetch of `/api/pedidos`.

use std::sync::Arc;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use logiflow_entity::order::Order;
use logiflow_realtime::topics::ORDERS_TOPIC;
use logiflow_realtime::{ChannelEvents, Message, RealtimeChannel, Subscription};

use crate::error::ClientError;
use crate::orders::{Fetched, OrderSource, OrdersClient};

/// Latest order list as seen by a dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    /// Orders from the last successful fetch.
    pub orders: Vec<Order>,
    /// Whether those orders are demo data.
    pub demo: bool,
    /// Error of the last fetch, if it failed.
    pub last_error: Option<ClientError>,
    /// Completed fetches, successful or not.
    pub revision: u64,
}

#[derive(Debug)]
struct FeedInner {
    client: OrdersClient,
    snapshot: watch::Sender<FeedSnapshot>,
    signal: Notify,
}

impl FeedInner {
    async fn refresh(&self) -> Result<(), ClientError> {
        let result = self.client.fetch().await;
        self.snapshot.send_modify(|snapshot| {
            snapshot.revision += 1;
            match &result {
                Ok(Fetched { data, source }) => {
                    snapshot.orders = data.clone();
                    snapshot.demo = *source == OrderSource::Demo;
                    snapshot.last_error = None;
                }
                Err(e) => snapshot.last_error = Some(e.clone()),
            }
        });
        match result {
            Ok(fetched) => {
                debug!(count = fetched.data.len(), "Order feed refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Order feed refresh failed");
                Err(e)
            }
        }
    }
}

/// Keeps the order list current.
///
/// Refreshes once when started and again on every signal. Signals that
/// arrive while a refresh runs collapse into one follow-up refresh.
#[derive(Debug, Clone)]
pub struct OrderFeed {
    inner: Arc<FeedInner>,
    worker: Arc<Worker>,
}

#[derive(Debug)]
struct Worker(JoinHandle<()>);

impl Drop for Worker {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl OrderFeed {
    /// Start the feed. Must be called inside a Tokio runtime.
    pub fn start(client: OrdersClient) -> Self {
        let inner = Arc::new(FeedInner {
            client,
            snapshot: watch::Sender::new(FeedSnapshot::default()),
            signal: Notify::new(),
        });
        inner.signal.notify_one();

        let worker_inner = inner.clone();
        let task = tokio::spawn(async move {
            loop {
                worker_inner.signal.notified().await;
                let _ = worker_inner.refresh().await;
            }
        });

        Self {
            inner,
            worker: Arc::new(Worker(task)),
        }
    }

    /// Request a refresh without waiting for it.
    pub fn signal(&self) {
        self.inner.signal.notify_one();
    }

    /// Refresh now and wait for the result.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.inner.refresh().await
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receiver notified on every completed fetch.
    pub fn watch(&self) -> watch::Receiver<FeedSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Re-fetch on every message published to `/topic/pedidos`.
    ///
    /// Follows the rules of [`RealtimeChannel::subscribe`]: the channel must
    /// be connected.
    pub fn follow(&self, channel: &RealtimeChannel) -> Subscription {
        let feed = self.clone();
        channel.subscribe(ORDERS_TOPIC, move |message: &Message| {
            debug!(kind = %message.message_type, "Order change signal");
            feed.signal();
        })
    }
}

/// As channel callbacks, re-fetch on configured order topics and on every handshake.
impl ChannelEvents for OrderFeed {
    fn on_message(&self, topic: &str, message: &Message) {
        if topic == ORDERS_TOPIC || topic.starts_with(&format!("{ORDERS_TOPIC}/")) {
            debug!(topic, kind = %message.message_type, "Order change signal");
            self.signal();
        }
    }

    fn on_connect(&self) {
        self.signal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::extract::State;
    use axum::routing::get;
    use axum::{Json, Router};
    use logiflow_core::config::{ApiConfig, OrdersConfig};
    use logiflow_core::traits::StaticToken;
    use serde_json::json;
    use tokio::time::timeout;

    async fn orders_client(hits: Arc<AtomicUsize>) -> OrdersClient {
        let router = Router::new()
            .route(
                "/api/pedidos",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                    let orders: Vec<_> = (1..=n)
                        .map(|id| json!({"id": id, "clienteId": 1, "direccionEntrega": "x", "estado": "PENDIENTE", "tarifa": 1.0}))
                        .collect();
                    Json(json!(orders))
                }),
            )
            .with_state(hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        OrdersClient::new(
            &ApiConfig {
                orders_url: format!("http://{addr}"),
                ..ApiConfig::default()
            },
            &OrdersConfig::default(),
            Arc::new(StaticToken(Some("tok".into()))),
        )
        .unwrap()
    }

    async fn wait_revision(feed: &OrderFeed, revision: u64) -> FeedSnapshot {
        let mut rx = feed.watch();
        let snapshot = timeout(Duration::from_secs(2), rx.wait_for(|s| s.revision >= revision))
            .await
            .unwrap()
            .unwrap()
            .clone();
        snapshot
    }

    #[tokio::test]
    async fn test_refreshes_on_start_and_on_signal() {
        let hits = Arc::new(AtomicUsize::new(0));
        let feed = OrderFeed::start(orders_client(hits.clone()).await);

        let first = wait_revision(&feed, 1).await;
        assert_eq!(first.orders.len(), 1);
        assert!(!first.demo);

        feed.on_message(ORDERS_TOPIC, &Message::raw("changed"));
        let second = wait_revision(&feed, 2).await;
        assert_eq!(second.orders.len(), 2);

        feed.on_message("/topic/tracking", &Message::raw("moved"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_orders() {
        let hits = Arc::new(AtomicUsize::new(0));
        let feed = OrderFeed::start(orders_client(hits).await);
        wait_revision(&feed, 1).await;

        let broken = OrderFeed {
            inner: Arc::new(FeedInner {
                client: OrdersClient::new(
                    &ApiConfig::default(),
                    &OrdersConfig::default(),
                    Arc::new(StaticToken(None)),
                )
                .unwrap(),
                snapshot: watch::Sender::new(feed.snapshot()),
                signal: Notify::new(),
            }),
            worker: feed.worker.clone(),
        };
        assert_eq!(broken.refresh().await, Err(ClientError::NotAuthenticated));
        let snapshot = broken.snapshot();
        assert_eq!(snapshot.orders.len(), 1);
        assert_eq!(snapshot.last_error, Some(ClientError::NotAuthenticated));
    }
}
