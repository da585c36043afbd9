//! LogiFlow destinations and the typed helpers the dashboards use.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use logiflow_entity::order::OrderEvent;

use crate::channel::RealtimeChannel;
use crate::message::Message;
use crate::subscription::Subscription;

/// Broadcast of every order change.
pub const ORDERS_TOPIC: &str = "/topic/pedidos";
/// Courier location updates.
pub const TRACKING_TOPIC: &str = "/topic/tracking";
/// Replies to [`PING_DESTINATION`].
pub const PONG_TOPIC: &str = "/topic/pong";
/// Liveness probe handled by the realtime service.
pub const PING_DESTINATION: &str = "/app/ping";
/// A courier starts a delivery.
pub const START_DELIVERY: &str = "/app/entrega/iniciar";
/// A courier confirms a delivery with a photo reference.
pub const CONFIRM_DELIVERY: &str = "/app/entrega/confirmar";

/// Per-order topic.
pub fn order_topic(order_id: i64) -> String {
    format!("{ORDERS_TOPIC}/{order_id}")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryStart {
    pedido_id: i64,
    timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryConfirmation<'a> {
    pedido_id: i64,
    foto: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct Ping {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: String,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl RealtimeChannel {
    /// Updates for one order; `handler` receives the message payload, with
    /// bare JSON events passed as parsed values.
    pub fn order_updates<F>(&self, order_id: i64, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(order_topic(order_id), move |message: &Message| {
            handler(&message.payload_json())
        })
    }

    /// Every order change, decoded. Payloads that are not order events are skipped.
    pub fn order_events<F>(&self, handler: F) -> Subscription
    where
        F: Fn(OrderEvent) + Send + Sync + 'static,
    {
        self.subscribe(ORDERS_TOPIC, move |message: &Message| {
            match message.payload_as::<OrderEvent>() {
                Some(event) => handler(event),
                None => debug!(kind = %message.message_type, "Skipping non-order payload"),
            }
        })
    }

    /// Courier tracking feed; `handler` receives the message payload.
    pub fn tracking_updates<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(TRACKING_TOPIC, move |message: &Message| {
            handler(&message.payload_json())
        })
    }

    /// Ask the service for a pong on [`PONG_TOPIC`].
    pub fn ping(&self) {
        self.send_message(
            PING_DESTINATION,
            &Ping {
                kind: "ping",
                timestamp: now(),
            },
        );
    }

    /// Tell the service a courier picked up `order_id`.
    pub fn start_delivery(&self, order_id: i64) {
        self.send_message(
            START_DELIVERY,
            &DeliveryStart {
                pedido_id: order_id,
                timestamp: now(),
            },
        );
    }

    /// Confirm delivery of `order_id` with a photo reference.
    pub fn confirm_delivery(&self, order_id: i64, photo: &str) {
        self.send_message(
            CONFIRM_DELIVERY,
            &DeliveryConfirmation {
                pedido_id: order_id,
                foto: photo,
                timestamp: now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use logiflow_core::config::RealtimeConfig;
    use logiflow_core::traits::StaticToken;
    use tokio::time::timeout;

    use crate::channel::tests::FakeTransport;
    use crate::state::ChannelState;
    use crate::stomp::Command;

    #[test]
    fn test_order_topic() {
        assert_eq!(order_topic(42), "/topic/pedidos/42");
    }

    async fn connected() -> (RealtimeChannel, crate::channel::tests::FakeServer) {
        let (transport, mut servers) = FakeTransport::new();
        let channel = RealtimeChannel::builder(
            RealtimeConfig {
                heartbeat_incoming_ms: 0,
                heartbeat_outgoing_ms: 0,
                ..RealtimeConfig::default()
            },
            Arc::new(StaticToken(Some("t".into()))),
        )
        .transport(transport)
        .build();
        channel.connect().unwrap();
        let mut server = servers.recv().await.unwrap();
        server.accept().await;
        let mut state = channel.watch_state();
        timeout(Duration::from_secs(2), state.wait_for(|s| *s == ChannelState::Connected))
            .await
            .unwrap()
            .unwrap();
        (channel, server)
    }

    #[tokio::test]
    async fn test_delivery_messages() {
        let (channel, mut server) = connected().await;

        channel.start_delivery(12);
        let start = server.next_frame().await;
        assert_eq!(start.command, Command::Send);
        assert_eq!(start.get("destination"), Some(START_DELIVERY));
        let body: Value = serde_json::from_str(&start.body).unwrap();
        assert_eq!(body["pedidoId"], 12);
        assert!(body["timestamp"].is_string());

        channel.confirm_delivery(12, "evidencia.jpg");
        let confirm = server.next_frame().await;
        assert_eq!(confirm.get("destination"), Some(CONFIRM_DELIVERY));
        let body: Value = serde_json::from_str(&confirm.body).unwrap();
        assert_eq!(body["foto"], "evidencia.jpg");
        assert_eq!(body["pedidoId"], 12);
    }

    #[tokio::test]
    async fn test_order_updates_pass_payload() {
        let (channel, mut server) = connected().await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _guard = channel.order_updates(5, move |payload| sink.lock().unwrap().push(payload.clone()));

        let subscribe = server.next_frame().await;
        assert_eq!(subscribe.get("destination"), Some("/topic/pedidos/5"));
        let id = subscribe.get("id").unwrap().to_string();
        server.message(&id, "/topic/pedidos/5", r#"{"type":"ORDER_UPDATED","payload":{"estado":"EN_RUTA"}}"#);

        timeout(Duration::from_secs(2), async {
            while seen.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(seen.lock().unwrap()[0]["estado"], "EN_RUTA");
    }

    #[tokio::test]
    async fn test_tracking_updates_parse_bare_events() {
        let (channel, mut server) = connected().await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _guard = channel.tracking_updates(move |payload| sink.lock().unwrap().push(payload.clone()));

        let subscribe = server.next_frame().await;
        assert_eq!(subscribe.get("destination"), Some(TRACKING_TOPIC));
        let id = subscribe.get("id").unwrap().to_string();
        server.message(&id, TRACKING_TOPIC, r#"{"repartidorId":9,"lat":-0.18,"lng":-78.48}"#);

        timeout(Duration::from_secs(2), async {
            while seen.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        let payload = seen.lock().unwrap()[0].clone();
        assert!(payload.is_object());
        assert_eq!(payload["repartidorId"], 9);
    }
}
