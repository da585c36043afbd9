//! Durable client storage configuration.

use serde::{Deserialize, Serialize};

/// Where the session tokens survive process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the JSON file backing the token store.
    #[serde(default = "default_session_file")]
    pub session_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_file: default_session_file(),
        }
    }
}

fn default_session_file() -> String {
    "data/session.json".to_string()
}
