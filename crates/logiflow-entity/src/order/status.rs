//! Order lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a delivery order, as reported by the order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created by the client, not yet accepted.
    Pendiente,
    /// Accepted by the order service.
    Recibido,
    /// Assigned to a courier.
    Asignado,
    /// Courier on the way.
    EnCamino,
    /// Courier at the destination.
    EnEntrega,
    /// Delivered.
    Entregado,
    /// Cancelled.
    Cancelado,
}

impl OrderStatus {
    /// Check if the order can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Entregado | Self::Cancelado)
    }

    /// Check if a courier is currently moving the order.
    pub fn is_in_transit(&self) -> bool {
        matches!(self, Self::Asignado | Self::EnCamino | Self::EnEntrega)
    }

    /// Return the status as the backend's wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "PENDIENTE",
            Self::Recibido => "RECIBIDO",
            Self::Asignado => "ASIGNADO",
            Self::EnCamino => "EN_CAMINO",
            Self::EnEntrega => "EN_ENTREGA",
            Self::Entregado => "ENTREGADO",
            Self::Cancelado => "CANCELADO",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let status: OrderStatus = serde_json::from_str("\"EN_CAMINO\"").unwrap();
        assert_eq!(status, OrderStatus::EnCamino);
        assert_eq!(
            serde_json::to_string(&OrderStatus::EnEntrega).unwrap(),
            "\"EN_ENTREGA\""
        );
    }

    #[test]
    fn test_terminal() {
        assert!(OrderStatus::Entregado.is_terminal());
        assert!(!OrderStatus::EnCamino.is_terminal());
        assert!(OrderStatus::EnCamino.is_in_transit());
    }
}
