//! Order read-side configuration.

use serde::{Deserialize, Serialize};

/// Order fetching and caching behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    /// Serve locally fabricated orders when the order service fails.
    ///
    /// Off by default: a backend failure is reported, not hidden.
    #[serde(default)]
    pub demo_fallback: bool,
    /// Lifetime of cached query results in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached query results.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            demo_fallback: false,
            cache_ttl_seconds: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_cache_capacity() -> u64 {
    256
}
