//! Fleet and KPI read models served by the GraphQL gateway.

pub mod model;

pub use model::{DailyKpi, FleetSummary, Vehicle};
