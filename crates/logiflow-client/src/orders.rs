//! REST client for the order service.

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use tracing::{debug, warn};

use logiflow_core::config::{ApiConfig, OrdersConfig};
use logiflow_core::error::AppError;
use logiflow_core::traits::TokenProvider;
use logiflow_entity::order::{NewOrder, Order, OrderStatus};

use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::http::{Backend, fetch_json};

const ORDERS_PATH: &str = "/api/pedidos";
const LIST_CACHE_KEY: &str = "orders:list";

/// Client id used by the demo data set.
pub const DEMO_CUSTOMER_ID: i64 = 1_724_562_440;

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSource {
    /// The order service.
    Live,
    /// Served from the query cache.
    Cached,
    /// Fabricated locally because the order service failed.
    Demo,
}

/// A result tagged with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    /// The value.
    pub data: T,
    /// Its origin.
    pub source: OrderSource,
}

impl<T> Fetched<T> {
    fn new(data: T, source: OrderSource) -> Self {
        Self { data, source }
    }

    /// Whether the value is fabricated.
    pub fn is_demo(&self) -> bool {
        self.source == OrderSource::Demo
    }
}

/// Client for `GET/POST /api/pedidos`.
#[derive(Debug, Clone)]
pub struct OrdersClient {
    backend: Backend,
    base_url: String,
    demo_fallback: bool,
    cache: Option<QueryCache>,
}

impl OrdersClient {
    /// Build a client for `api.orders_url`.
    pub fn new(
        api: &ApiConfig,
        orders: &OrdersConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::new(api, tokens)?,
            base_url: api.orders_url.trim_end_matches('/').to_string(),
            demo_fallback: orders.demo_fallback,
            cache: None,
        })
    }

    /// Serve repeated `list` calls from `cache` until a create or logout.
    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, ORDERS_PATH)
    }

    /// All orders visible to the signed-in user.
    pub async fn list(&self) -> Result<Fetched<Vec<Order>>, ClientError> {
        if let Some(orders) = self.cached().await {
            return Ok(Fetched::new(orders, OrderSource::Cached));
        }
        self.fetch().await
    }

    /// Like [`list`](Self::list) but always asks the order service.
    pub async fn fetch(&self) -> Result<Fetched<Vec<Order>>, ClientError> {
        let request = self.backend.request(Method::GET, &self.url())?;
        match fetch_json::<Vec<Order>>(request).await {
            Ok(orders) => {
                debug!(count = orders.len(), "Fetched orders");
                if let Some(cache) = &self.cache {
                    cache.insert(LIST_CACHE_KEY, &orders).await;
                }
                Ok(Fetched::new(orders, OrderSource::Live))
            }
            Err(e) if self.demo_fallback => {
                warn!(error = %e, "Order service failed, serving demo orders");
                Ok(Fetched::new(demo_orders(), OrderSource::Demo))
            }
            Err(e) => Err(e),
        }
    }

    /// Create an order. The order service assigns the id.
    pub async fn create(&self, order: &NewOrder) -> Result<Fetched<Order>, ClientError> {
        let request = self.backend.request(Method::POST, &self.url())?.json(order);
        let created = fetch_json::<Order>(request).await;
        if let Some(cache) = &self.cache {
            cache.remove(LIST_CACHE_KEY).await;
        }
        match created {
            Ok(created) => {
                debug!(id = created.id, "Created order");
                Ok(Fetched::new(created, OrderSource::Live))
            }
            Err(e) if self.demo_fallback => {
                warn!(error = %e, "Order service failed, creating demo order");
                let id = demo_orders().len() as i64 + 1;
                Ok(Fetched::new(demo_order(id, order), OrderSource::Demo))
            }
            Err(e) => Err(e),
        }
    }

    async fn cached(&self) -> Option<Vec<Order>> {
        self.cache.as_ref()?.get(LIST_CACHE_KEY).await
    }
}

fn demo_order(id: i64, order: &NewOrder) -> Order {
    Order {
        id,
        customer_id: order.customer_id,
        courier_id: None,
        delivery_address: order.delivery_address.clone(),
        status: order.status,
        fee: order.fee,
        origin: None,
        destination: None,
        weight: None,
        description: None,
        created_at: None,
    }
}

/// The fixed demo data set.
pub fn demo_orders() -> Vec<Order> {
    let mut orders = vec![
        demo_order(
            1,
            &NewOrder::pending(DEMO_CUSTOMER_ID, "Av. Amazonas N36-152, Quito", 15.50),
        ),
        demo_order(
            2,
            &NewOrder::pending(DEMO_CUSTOMER_ID, "Calle García Moreno, Centro Histórico", 12.00),
        ),
        demo_order(
            3,
            &NewOrder::pending(DEMO_CUSTOMER_ID, "Mall El Jardín, Local 234", 8.50),
        ),
    ];
    orders[0].status = OrderStatus::EnCamino;
    orders[0].courier_id = Some(1);
    orders[2].status = OrderStatus::Entregado;
    orders[2].courier_id = Some(2);
    orders
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use logiflow_core::traits::StaticToken;
    use serde_json::{Value, json};

    async fn spawn(router: Router) -> ApiConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiConfig {
            orders_url: format!("http://{addr}"),
            ..ApiConfig::default()
        }
    }

    fn order_json(id: i64) -> Value {
        json!({
            "id": id,
            "clienteId": 1709473852,
            "direccionEntrega": "Av. 6 de Diciembre",
            "estado": "PENDIENTE",
            "tarifa": 10.0
        })
    }

    fn client(api: &ApiConfig, demo_fallback: bool, token: Option<&str>) -> OrdersClient {
        OrdersClient::new(
            api,
            &OrdersConfig {
                demo_fallback,
                ..OrdersConfig::default()
            },
            Arc::new(StaticToken(token.map(String::from))),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_sends_bearer_token() {
        let router = Router::new().route(
            "/api/pedidos",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer tok");
                assert!(headers.contains_key("x-request-id"));
                Json(json!([order_json(1), order_json(2)]))
            }),
        );
        let api = spawn(router).await;

        let fetched = client(&api, false, Some("tok")).list().await.unwrap();
        assert_eq!(fetched.source, OrderSource::Live);
        assert_eq!(fetched.data.len(), 2);
        assert_eq!(fetched.data[1].id, 2);
    }

    #[tokio::test]
    async fn test_failure_is_error_unless_demo_enabled() {
        let router = Router::new().route(
            "/api/pedidos",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }).post(|| async { StatusCode::BAD_GATEWAY }),
        );
        let api = spawn(router).await;

        let err = client(&api, false, Some("tok")).list().await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 500, .. }));

        let demo = client(&api, true, Some("tok"));
        let fetched = demo.list().await.unwrap();
        assert!(fetched.is_demo());
        assert_eq!(fetched.data, demo_orders());

        let created = demo
            .create(&NewOrder::pending(7, "Calle Larga", 9.0))
            .await
            .unwrap();
        assert!(created.is_demo());
        assert_eq!(created.data.id, 4);
        assert_eq!(created.data.status, OrderStatus::Pendiente);
    }

    #[tokio::test]
    async fn test_missing_token_never_falls_back() {
        let api = ApiConfig::default();
        let err = client(&api, true, None).list().await.unwrap_err();
        assert_eq!(err, ClientError::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_cache_serves_list_until_create() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/pedidos",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!([order_json(1)]))
                })
                .post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["estado"], "PENDIENTE");
                    (StatusCode::CREATED, Json(order_json(2)))
                }),
            )
            .with_state(hits.clone());
        let api = spawn(router).await;
        let orders = client(&api, false, Some("tok")).with_cache(QueryCache::new(&OrdersConfig::default()));

        assert_eq!(orders.list().await.unwrap().source, OrderSource::Live);
        assert_eq!(orders.list().await.unwrap().source, OrderSource::Cached);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let created = orders
            .create(&NewOrder::pending(1709473852, "Av. 6 de Diciembre", 10.0))
            .await
            .unwrap();
        assert_eq!(created.data.id, 2);
        assert_eq!(orders.list().await.unwrap().source, OrderSource::Live);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
