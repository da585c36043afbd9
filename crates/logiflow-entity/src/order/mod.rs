//! Delivery order entities.

pub mod model;
pub mod status;

pub use model::{NewOrder, Order, OrderEvent};
pub use status::OrderStatus;
