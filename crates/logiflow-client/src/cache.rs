//! In-memory query result cache using moka.
//!
//! Entries are JSON strings so any serde type can be cached. The cache is
//! bound to the signed-in session: register it with the session manager and
//! logout empties it.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use logiflow_core::config::OrdersConfig;
use logiflow_core::traits::SessionCache;

/// Query result cache shared by the read-side clients.
#[derive(Debug, Clone)]
pub struct QueryCache {
    cache: Cache<String, String>,
}

impl QueryCache {
    /// Create a cache sized and aged from configuration.
    pub fn new(config: &OrdersConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();
        Self { cache }
    }

    /// Cached value for `key`, if present and still decodable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.cache.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Query cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.cache.invalidate(key).await;
                None
            }
        }
    }

    /// Store `value` under `key`.
    pub async fn insert<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.cache.insert(key.to_string(), raw).await,
            Err(e) => warn!(key, error = %e, "Value not cacheable"),
        }
    }

    /// Drop one entry.
    pub async fn remove(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Number of live entries.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Whether the cache holds nothing.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionCache for QueryCache {
    async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Query cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_and_logout_clear() {
        let cache = QueryCache::new(&OrdersConfig::default());
        cache.insert("kpis:2026-10-16", &vec![1, 2, 3]).await;
        cache.insert("vehiculos", &"x").await;

        assert_eq!(cache.get::<Vec<i32>>("kpis:2026-10-16").await, Some(vec![1, 2, 3]));
        assert_eq!(cache.len().await, 2);

        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
        assert_eq!(cache.get::<String>("vehiculos").await, None);
    }

    #[tokio::test]
    async fn test_wrong_type_is_a_miss() {
        let cache = QueryCache::new(&OrdersConfig::default());
        cache.insert("pedido:1", &"not a list").await;
        assert_eq!(cache.get::<Vec<i32>>("pedido:1").await, None);
        assert_eq!(cache.len().await, 0);
    }
}
