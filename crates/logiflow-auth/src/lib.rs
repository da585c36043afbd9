//! # logiflow-auth
//!
//! Client-side authentication for the LogiFlow dashboards.
//!
//! ## Modules
//!
//! - `token`: unverified JWT payload decoding (role, zone, expiry)
//! - `store`: durable key/value token storage (memory and JSON file)
//! - `api`: auth service HTTP contract (login, refresh, register)
//! - `session`: the session manager and its observable state
//! - `validation`: local registration form checks
//! - `gate`: route access decisions and the dashboard route table

pub mod api;
pub mod error;
pub mod gate;
pub mod session;
pub mod store;
pub mod token;
pub mod validation;

pub use api::{AuthApi, HttpAuthApi};
pub use error::{AuthError, ValidationError};
pub use gate::{GateDecision, PublicDecision, RouteTable, decide, decide_public, landing_path};
pub use session::{Session, SessionManager, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, StoreWrite, TokenStore};
pub use token::TokenClaims;
pub use validation::RegistrationForm;
