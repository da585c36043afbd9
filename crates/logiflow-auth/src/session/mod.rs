//! Session lifecycle: hydrate, login, refresh, logout.

pub mod login;
pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::{Session, SessionState};
