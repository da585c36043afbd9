//! Traits defined in `logiflow-core` and implemented by other crates.
//!
//! They let the realtime and client crates read the session without
//! depending on `logiflow-auth`.

pub mod session;

pub use session::{SessionCache, StaticToken, TokenProvider};
