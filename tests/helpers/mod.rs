//! Shared test helpers for integration tests.
//!
//! [`TestBackend`] serves the auth, orders and realtime endpoints the
//! dashboard talks to from a single local Axum server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, mpsc};

use logiflow_core::config::{ApiConfig, AppConfig, OrdersConfig, RealtimeConfig, StorageConfig};
use logiflow_realtime::stomp::{Command, Frame, decode_frames};
use logiflow_realtime::topics::{PING_DESTINATION, PONG_TOPIC};
use logiflow_realtime::{ChannelError, ChannelEvents, Message};

/// Cédula of the seeded account.
pub const CEDULA: &str = "1709473852";
/// Password of the seeded account.
pub const PASSWORD: &str = "Gerente2024";
/// Cédula of the seeded client account.
pub const CLIENT_CEDULA: &str = "1724562440";
/// Password of the seeded client account.
pub const CLIENT_PASSWORD: &str = "Cliente2024";
/// Refresh token issued on login.
pub const REFRESH_TOKEN: &str = "refresh-1";

/// Build an unsigned compact JWT carrying `claims`.
pub fn token_with(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Access token for the seeded account.
pub fn manager_token() -> String {
    token_with(&json!({
        "sub": CEDULA,
        "role": "GERENTE",
        "zone_id": "Z-NORTE",
        "exp": 4102444800i64
    }))
}

/// Access token for the seeded client account.
pub fn client_token() -> String {
    token_with(&json!({
        "sub": CLIENT_CEDULA,
        "role": "CLIENTE",
        "exp": 4102444800i64
    }))
}

/// Access token handed out by `POST /api/auth/token/refresh`.
pub fn refreshed_token() -> String {
    token_with(&json!({
        "sub": CEDULA,
        "role": "GERENTE",
        "zone_id": "Z-NORTE",
        "exp": 4102448400i64
    }))
}

#[derive(Clone)]
struct BackendState {
    token: String,
    client_token: String,
    orders: Arc<Mutex<Vec<Value>>>,
    order_hits: Arc<AtomicUsize>,
    publish: broadcast::Sender<(String, String)>,
    sent: mpsc::UnboundedSender<(String, String)>,
    subscribed: mpsc::UnboundedSender<String>,
}

/// Local auth, orders and STOMP broker.
pub struct TestBackend {
    /// `host:port` of the server.
    pub addr: String,
    /// Token the backend issues and accepts.
    pub token: String,
    order_hits: Arc<AtomicUsize>,
    publish: broadcast::Sender<(String, String)>,
    sent: Mutex<mpsc::UnboundedReceiver<(String, String)>>,
    subscribed: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl TestBackend {
    /// Start the backend with two seeded orders, one of them placed by the
    /// client account.
    pub async fn start() -> Self {
        let token = manager_token();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (subscribed_tx, subscribed_rx) = mpsc::unbounded_channel();
        let (publish, _) = broadcast::channel(64);
        let order_hits = Arc::new(AtomicUsize::new(0));

        let state = BackendState {
            token: token.clone(),
            client_token: client_token(),
            orders: Arc::new(Mutex::new(vec![
                order_json(1, CLIENT_CEDULA, "EN_CAMINO"),
                order_json(2, "1102345671", "PENDIENTE"),
            ])),
            order_hits: order_hits.clone(),
            publish: publish.clone(),
            sent: sent_tx,
            subscribed: subscribed_tx,
        };

        let router = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/token/refresh", post(refresh))
            .route("/api/pedidos", get(list_orders).post(create_order))
            .route("/ws", get(upgrade))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            token,
            order_hits,
            publish,
            sent: Mutex::new(sent_rx),
            subscribed: Mutex::new(subscribed_rx),
        }
    }

    /// Configuration pointing every endpoint at this backend.
    pub fn config(&self, session_file: &Path) -> AppConfig {
        let base = format!("http://{}", self.addr);
        AppConfig {
            api: ApiConfig {
                auth_url: base.clone(),
                orders_url: base.clone(),
                graphql_url: format!("{base}/graphql"),
                request_timeout_seconds: 5,
            },
            realtime: RealtimeConfig {
                url: format!("ws://{}/ws", self.addr),
                reconnect_delay_ms: 200,
                connect_timeout_seconds: 5,
                ..RealtimeConfig::default()
            },
            storage: StorageConfig {
                session_file: session_file.to_string_lossy().to_string(),
            },
            orders: OrdersConfig::default(),
            ..AppConfig::default()
        }
    }

    /// `GET /api/pedidos` requests served so far.
    pub fn order_hits(&self) -> usize {
        self.order_hits.load(Ordering::SeqCst)
    }

    /// Publish `body` on `destination` to every subscribed client.
    pub fn publish(&self, destination: &str, body: &Value) {
        let _ = self.publish.send((destination.to_string(), body.to_string()));
    }

    /// Next `SEND` frame a client published, as `(destination, body)`.
    pub async fn next_sent(&self) -> (String, Value) {
        let (destination, body) = within(self.sent.lock().await.recv()).await.unwrap();
        (destination, serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    /// Wait until a client subscribes to `topic`.
    pub async fn wait_subscribed(&self, topic: &str) {
        let mut subscribed = self.subscribed.lock().await;
        loop {
            let next = within(subscribed.recv()).await.unwrap();
            if next == topic {
                return;
            }
        }
    }
}

/// Fail the test when `future` takes longer than five seconds.
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    within(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}

/// Forwards configured-topic messages and errors to the test.
#[derive(Debug)]
pub struct Recorder {
    messages: mpsc::UnboundedSender<(String, Message)>,
    errors: mpsc::UnboundedSender<String>,
}

impl Recorder {
    /// Recorder plus receivers for messages and errors.
    pub fn new() -> (
        Arc<Self>,
        mpsc::UnboundedReceiver<(String, Message)>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (messages, messages_rx) = mpsc::unbounded_channel();
        let (errors, errors_rx) = mpsc::unbounded_channel();
        (Arc::new(Self { messages, errors }), messages_rx, errors_rx)
    }
}

impl ChannelEvents for Recorder {
    fn on_error(&self, error: &ChannelError) {
        let _ = self.errors.send(error.to_string());
    }

    fn on_message(&self, topic: &str, message: &Message) {
        let _ = self.messages.send((topic.to_string(), message.clone()));
    }
}

fn order_json(id: i64, cliente: &str, estado: &str) -> Value {
    json!({
        "id": id,
        "clienteId": cliente.parse::<i64>().unwrap(),
        "direccionEntrega": "Av. Amazonas N24-03",
        "estado": estado,
        "tarifa": 12.5
    })
}

async fn login(State(state): State<BackendState>, Json(body): Json<Value>) -> Response {
    if body["username"] == CEDULA && body["password"] == PASSWORD {
        Json(json!({
            "access_token": state.token,
            "refresh_token": REFRESH_TOKEN,
            "nombre": "Ana Gerente"
        }))
        .into_response()
    } else if body["username"] == CLIENT_CEDULA && body["password"] == CLIENT_PASSWORD {
        Json(json!({
            "access_token": state.client_token,
            "refresh_token": REFRESH_TOKEN,
            "nombre": "Luis Cliente"
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Credenciales inválidas" })),
        )
            .into_response()
    }
}

async fn refresh(Json(body): Json<Value>) -> Response {
    if body["refresh_token"] == REFRESH_TOKEN {
        Json(json!({ "access_token": refreshed_token(), "token_type": "Bearer" })).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Which seeded account a request's bearer token belongs to.
#[derive(PartialEq)]
enum Caller {
    Manager,
    Client,
}

fn caller(state: &BackendState, headers: &HeaderMap) -> Option<Caller> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())?
        .strip_prefix("Bearer ")?;
    if bearer == state.token {
        Some(Caller::Manager)
    } else if bearer == state.client_token {
        Some(Caller::Client)
    } else {
        None
    }
}

fn authorized(state: &BackendState, headers: &HeaderMap) -> bool {
    caller(state, headers).is_some()
}

/// Managers see every order, clients only their own.
async fn list_orders(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    let Some(caller) = caller(&state, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    state.order_hits.fetch_add(1, Ordering::SeqCst);
    let orders = state.orders.lock().await;
    let visible: Vec<Value> = orders
        .iter()
        .filter(|order| caller == Caller::Manager || order["clienteId"].to_string() == CLIENT_CEDULA)
        .cloned()
        .collect();
    Json(Value::Array(visible)).into_response()
}

async fn create_order(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut orders = state.orders.lock().await;
    body["id"] = json!(orders.len() as i64 + 1);
    orders.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<BackendState>,
) -> Response {
    if query.get("token") != Some(&state.token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| broker(socket, state))
}

/// Minimal STOMP 1.2 broker: one connection, no acknowledgements.
async fn broker(mut socket: WebSocket, state: BackendState) {
    let mut publications = state.publish.subscribe();
    let mut subscriptions: Vec<(String, String)> = Vec::new();
    let mut delivered = 0u64;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(WsMessage::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => continue,
                };
                let Ok(frames) = decode_frames(&text) else {
                    return;
                };
                for frame in frames {
                    match frame.command {
                        Command::Connect => {
                            let expected = format!("Bearer {}", state.token);
                            let reply = if frame.get("Authorization") == Some(expected.as_str()) {
                                Frame::new(Command::Connected)
                                    .header("version", "1.2")
                                    .header("heart-beat", "0,0")
                            } else {
                                Frame::new(Command::Error).header("message", "Token inválido")
                            };
                            if socket.send(WsMessage::Text(reply.encode().into())).await.is_err() {
                                return;
                            }
                        }
                        Command::Subscribe => {
                            let id = frame.get("id").unwrap_or_default().to_string();
                            let destination = frame.get("destination").unwrap_or_default().to_string();
                            let _ = state.subscribed.send(destination.clone());
                            subscriptions.push((id, destination));
                        }
                        Command::Unsubscribe => {
                            let id = frame.get("id").unwrap_or_default();
                            subscriptions.retain(|(sub, _)| sub != id);
                        }
                        Command::Send => {
                            let destination = frame.get("destination").unwrap_or_default().to_string();
                            if destination == PING_DESTINATION {
                                let pong = json!({
                                    "type": "pong",
                                    "payload": { "message": "pong" },
                                    "timestamp": "2024-05-01T12:00:00Z"
                                });
                                if !deliver(&mut socket, &subscriptions, &mut delivered, PONG_TOPIC, &pong.to_string()).await {
                                    return;
                                }
                            } else {
                                let _ = state.sent.send((destination, frame.body));
                            }
                        }
                        Command::Disconnect => return,
                        _ => {}
                    }
                }
            }
            Ok((destination, body)) = publications.recv() => {
                if !deliver(&mut socket, &subscriptions, &mut delivered, &destination, &body).await {
                    return;
                }
            }
        }
    }
}

async fn deliver(
    socket: &mut WebSocket,
    subscriptions: &[(String, String)],
    delivered: &mut u64,
    destination: &str,
    body: &str,
) -> bool {
    for (id, topic) in subscriptions.iter().filter(|(_, topic)| topic == destination) {
        *delivered += 1;
        let frame = Frame::new(Command::Message)
            .header("destination", topic.as_str())
            .header("subscription", id.as_str())
            .header("message-id", delivered.to_string())
            .header("content-type", "application/json")
            .with_body(body);
        if socket.send(WsMessage::Text(frame.encode().into())).await.is_err() {
            return false;
        }
    }
    true
}
