//! # logiflow-entity
//!
//! Domain models for the LogiFlow client SDK. Every struct here mirrors a
//! backend wire shape (REST, GraphQL or realtime payload) and derives
//! `Debug`, `Clone`, `Serialize`, and `Deserialize`.

pub mod fleet;
pub mod order;
pub mod user;
