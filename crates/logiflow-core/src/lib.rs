//! # logiflow-core
//!
//! Core crate for the LogiFlow client SDK. Contains configuration schemas,
//! the traits shared between the session and realtime layers, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other LogiFlow crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
