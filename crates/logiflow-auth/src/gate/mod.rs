//! Route access decisions.
//!
//! Pure functions over a [`SessionState`](crate::session::SessionState)
//! snapshot; the caller performs the navigation.

pub mod decision;
pub mod routes;

pub use decision::{GateDecision, PublicDecision, decide, decide_public, landing_path};
pub use routes::{Navigation, RouteAccess, RouteTable};
