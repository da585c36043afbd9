//! Order entity model.

use serde::{Deserialize, Serialize};

use super::status::OrderStatus;

/// A delivery order as returned by `GET /api/pedidos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier.
    pub id: i64,
    /// Owning client.
    #[serde(rename = "clienteId")]
    pub customer_id: i64,
    /// Assigned courier, if any.
    #[serde(rename = "repartidorId", default, skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<i64>,
    /// Delivery address.
    #[serde(rename = "direccionEntrega")]
    pub delivery_address: String,
    /// Current status.
    #[serde(rename = "estado")]
    pub status: OrderStatus,
    /// Delivery fee.
    #[serde(rename = "tarifa")]
    pub fee: f64,
    /// Pickup location.
    #[serde(rename = "origen", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Drop-off location.
    #[serde(rename = "destino", default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Parcel weight in kilograms.
    #[serde(rename = "peso", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Free-form description.
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time as sent by the backend.
    #[serde(rename = "fechaCreacion", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of `POST /api/pedidos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Owning client.
    #[serde(rename = "clienteId")]
    pub customer_id: i64,
    /// Delivery address.
    #[serde(rename = "direccionEntrega")]
    pub delivery_address: String,
    /// Delivery fee.
    #[serde(rename = "tarifa")]
    pub fee: f64,
    /// Initial status; always `PENDIENTE` for client-created orders.
    #[serde(rename = "estado")]
    pub status: OrderStatus,
}

impl NewOrder {
    /// A pending order for the given client.
    pub fn pending(customer_id: i64, delivery_address: impl Into<String>, fee: f64) -> Self {
        Self {
            customer_id,
            delivery_address: delivery_address.into(),
            fee,
            status: OrderStatus::Pendiente,
        }
    }
}

/// Order change pushed by the broker on `/topic/pedidos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    /// Event identifier.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Order the event refers to.
    #[serde(rename = "pedidoId")]
    pub order_id: i64,
    /// Owning client.
    #[serde(rename = "clienteId", default)]
    pub customer_id: Option<i64>,
    /// New status.
    #[serde(rename = "estado", default)]
    pub status: Option<OrderStatus>,
    /// Delivery address.
    #[serde(rename = "direccionEntrega", default)]
    pub delivery_address: Option<String>,
    /// Delivery fee.
    #[serde(rename = "tarifa", default)]
    pub fee: Option<f64>,
    /// Event time as sent by the backend.
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_order() {
        let json = r#"{"id":7,"clienteId":1724562440,"direccionEntrega":"Av. Amazonas","estado":"ASIGNADO","tarifa":15.5,"repartidorId":3}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, 7);
        assert_eq!(order.courier_id, Some(3));
        assert_eq!(order.status, OrderStatus::Asignado);
        assert!(order.origin.is_none());
    }

    #[test]
    fn test_new_order_body() {
        let body = serde_json::to_value(NewOrder::pending(42, "Calle 1", 12.0)).unwrap();
        assert_eq!(body["clienteId"], 42);
        assert_eq!(body["direccionEntrega"], "Calle 1");
        assert_eq!(body["estado"], "PENDIENTE");
    }

    #[test]
    fn test_order_event_from_broker() {
        let json = r#"{"eventId":"e1","pedidoId":9,"clienteId":5,"estado":"EN_CAMINO","tarifa":3.0,"timestamp":"2024-01-01T00:00:00"}"#;
        let event: OrderEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.order_id, 9);
        assert_eq!(event.status, Some(OrderStatus::EnCamino));
    }
}
