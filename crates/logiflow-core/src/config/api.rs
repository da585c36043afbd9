//! Backend endpoint configuration.

use serde::{Deserialize, Serialize};

/// Base URLs of the REST and GraphQL backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the authentication service (login, register, refresh).
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Base URL of the order service.
    #[serde(default = "default_orders_url")]
    pub orders_url: String,
    /// Full URL of the GraphQL endpoint.
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            orders_url: default_orders_url(),
            graphql_url: default_graphql_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_auth_url() -> String {
    "http://localhost:8085".to_string()
}

fn default_orders_url() -> String {
    "http://localhost:9082".to_string()
}

fn default_graphql_url() -> String {
    "http://localhost:8088/graphql".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
