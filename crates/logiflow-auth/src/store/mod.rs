//! Durable token storage.
//!
//! The session persists three string keys. Writes are batched so a login
//! lands all keys together or none of them.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use logiflow_core::AppResult;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

/// Storage key for the access token.
pub const TOKEN_KEY: &str = "token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the JSON-encoded user.
pub const USER_KEY: &str = "user";

/// A single mutation inside a [`TokenStore::apply`] batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// Set `key` to `value`.
    Set(&'static str, String),
    /// Remove `key` if present.
    Remove(&'static str),
}

/// Key/value storage that survives restarts.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug + 'static {
    /// Read a key.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Apply every write in order as one atomic update.
    async fn apply(&self, writes: Vec<StoreWrite>) -> AppResult<()>;

    /// Remove every session key.
    async fn clear(&self) -> AppResult<()> {
        self.apply(vec![
            StoreWrite::Remove(TOKEN_KEY),
            StoreWrite::Remove(REFRESH_TOKEN_KEY),
            StoreWrite::Remove(USER_KEY),
        ])
        .await
    }
}

/// Apply a batch to an in-memory map.
pub(crate) fn apply_to_map(
    map: &mut std::collections::HashMap<String, String>,
    writes: Vec<StoreWrite>,
) {
    for write in writes {
        match write {
            StoreWrite::Set(key, value) => {
                map.insert(key.to_string(), value);
            }
            StoreWrite::Remove(key) => {
                map.remove(key);
            }
        }
    }
}
