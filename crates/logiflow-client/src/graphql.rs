//! GraphQL read side: orders, vehicles and KPIs for the manager dashboards.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use logiflow_core::config::ApiConfig;
use logiflow_core::error::AppError;
use logiflow_core::traits::TokenProvider;
use logiflow_entity::fleet::{DailyKpi, FleetSummary, Vehicle};
use logiflow_entity::order::Order;

use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::http::{Backend, fetch_json};

const ORDER_FIELDS: &str = "id clienteId repartidorId direccionEntrega origen destino estado tarifa peso descripcion fechaCreacion";
const VEHICLE_FIELDS: &str = "id tipo placa modelo capacidadCarga estado";

/// Optional filter for the `pedidos` query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    /// Only orders in this status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    /// Only orders of this client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliente_id: Option<i64>,
    /// Only orders of this courier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repartidor_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    query: String,
    variables: &'a Value,
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlError {
    /// Error text.
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

/// Client for the GraphQL gateway.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    backend: Backend,
    url: String,
    cache: Option<QueryCache>,
}

impl GraphQlClient {
    /// Build a client for `api.graphql_url`.
    pub fn new(api: &ApiConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::new(api, tokens)?,
            url: api.graphql_url.clone(),
            cache: None,
        })
    }

    /// Cache query results in `cache`.
    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run `query` and decode `data.<field>`.
    ///
    /// Errors next to data are logged and the data is still returned.
    pub async fn query<T: DeserializeOwned + Serialize>(
        &self,
        field: &str,
        query: String,
        variables: Value,
    ) -> Result<T, ClientError> {
        let key = format!("{field}:{variables}");
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get::<T>(&key).await {
                return Ok(hit);
            }
        }

        let request = self.backend.request(Method::POST, &self.url)?.json(&Request {
            query,
            variables: &variables,
        });
        let response: Response = fetch_json(request).await?;

        if !response.errors.is_empty() {
            let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
            error!(field, errors = ?messages, "GraphQL errors");
        }

        let value = match response.data.and_then(|mut data| data.get_mut(field).map(Value::take)) {
            Some(value) if !value.is_null() => value,
            _ => {
                return Err(match response.errors.first() {
                    Some(first) => ClientError::GraphQl(first.message.clone()),
                    None => ClientError::Decode(format!("GraphQL response has no '{field}'")),
                });
            }
        };

        let decoded: T = serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))?;
        debug!(field, "GraphQL query completed");
        if let Some(cache) = &self.cache {
            cache.insert(&key, &decoded).await;
        }
        Ok(decoded)
    }

    /// `pedidos(filtro)`.
    pub async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ClientError> {
        let query = format!(
            "query GetPedidos($filtro: PedidoFiltro) {{ pedidos(filtro: $filtro) {{ {ORDER_FIELDS} }} }}"
        );
        self.query("pedidos", query, json!({ "filtro": filter })).await
    }

    /// `pedido(id)`; `None` when the order does not exist.
    pub async fn order(&self, id: i64) -> Result<Option<Order>, ClientError> {
        let query = format!("query GetPedido($id: ID!) {{ pedido(id: $id) {{ {ORDER_FIELDS} }} }}");
        match self.query("pedido", query, json!({ "id": id.to_string() })).await {
            Ok(order) => Ok(Some(order)),
            Err(ClientError::Decode(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `vehiculos`.
    pub async fn vehicles(&self) -> Result<Vec<Vehicle>, ClientError> {
        let query = format!("query GetVehiculos {{ vehiculos {{ {VEHICLE_FIELDS} }} }}");
        self.query("vehiculos", query, json!({})).await
    }

    /// `kpiDiario(fecha)`; today when `date` is `None`.
    pub async fn daily_kpis(&self, date: Option<&str>) -> Result<DailyKpi, ClientError> {
        let query = "query GetKPIDiario($fecha: String) { kpiDiario(fecha: $fecha) { fecha totalPedidos pedidosEntregados pedidosCancelados tiempoPromedioEntrega satisfaccionCliente costoPorEntrega } }".to_string();
        self.query("kpiDiario", query, json!({ "fecha": date })).await
    }

    /// `flotaActiva`.
    pub async fn fleet_summary(&self) -> Result<FleetSummary, ClientError> {
        let query = "query GetFlotaActiva { flotaActiva { total disponibles enRuta enMantenimiento } }".to_string();
        self.query("flotaActiva", query, json!({})).await
    }
}
