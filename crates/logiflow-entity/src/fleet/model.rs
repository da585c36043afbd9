//! Vehicle and KPI read models.

use serde::{Deserialize, Serialize};

/// A fleet vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Vehicle identifier.
    pub id: String,
    /// Vehicle kind (`MOTORIZADO`, `AUTO`, `CAMIONETA`, `CAMION`).
    #[serde(rename = "tipo")]
    pub kind: String,
    /// License plate.
    #[serde(rename = "placa")]
    pub plate: String,
    /// Model name.
    #[serde(rename = "modelo", default)]
    pub model: Option<String>,
    /// Load capacity in kilograms.
    #[serde(rename = "capacidadCarga", default)]
    pub capacity: Option<f64>,
    /// Availability status.
    #[serde(rename = "estado")]
    pub status: String,
}

/// Daily delivery KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyKpi {
    /// Reporting date.
    #[serde(rename = "fecha")]
    pub date: String,
    /// Orders created that day.
    #[serde(rename = "totalPedidos")]
    pub total_orders: i64,
    /// Orders delivered.
    #[serde(rename = "pedidosEntregados")]
    pub delivered: i64,
    /// Orders cancelled.
    #[serde(rename = "pedidosCancelados")]
    pub cancelled: i64,
    /// Mean delivery time in minutes.
    #[serde(rename = "tiempoPromedioEntrega", default)]
    pub avg_delivery_minutes: Option<f64>,
    /// Customer satisfaction score.
    #[serde(rename = "satisfaccionCliente", default)]
    pub satisfaction: Option<f64>,
    /// Average cost per delivery.
    #[serde(rename = "costoPorEntrega", default)]
    pub cost_per_delivery: Option<f64>,
}

/// Fleet availability snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    /// All vehicles.
    pub total: i64,
    /// Vehicles free to take orders.
    #[serde(rename = "disponibles")]
    pub available: i64,
    /// Vehicles on a route.
    #[serde(rename = "enRuta")]
    pub on_route: i64,
    /// Vehicles in maintenance.
    #[serde(rename = "enMantenimiento")]
    pub in_maintenance: i64,
}
