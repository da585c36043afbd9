//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field has a default so an empty file is valid.

pub mod api;
pub mod logging;
pub mod orders;
pub mod realtime;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::api::ApiConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::orders::OrdersConfig;
pub use self::realtime::RealtimeConfig;
pub use self::storage::StorageConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "LOGIFLOW";

/// Root application configuration.
///
/// Deserialization target for the merged configuration: the base file,
/// an optional environment overlay, then `LOGIFLOW__SECTION__KEY` variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST and GraphQL endpoints.
    #[serde(default)]
    pub api: ApiConfig,
    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Durable token storage.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Order fetching and caching.
    #[serde(default)]
    pub orders: OrdersConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a base file and an environment overlay.
    ///
    /// `path` is the base TOML file (missing files are allowed); the overlay
    /// is `config/{env}.toml`.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let base = path.strip_suffix(".toml").unwrap_or(path);

        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
