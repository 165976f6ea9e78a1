use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the users module (`modules.users`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsersConfig {
    /// Deadline for every store call made while handling a request; 0 disables it.
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_max_body_size_bytes")]
    pub max_body_size_bytes: usize,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            store_timeout_secs: default_store_timeout_secs(),
            max_body_size_bytes: default_max_body_size_bytes(),
            database: default_database(),
            collection: default_collection(),
        }
    }
}

impl UsersConfig {
    /// `None` when `store_timeout_secs` is 0.
    #[must_use]
    pub fn store_timeout(&self) -> Option<Duration> {
        (self.store_timeout_secs > 0).then(|| Duration::from_secs(self.store_timeout_secs))
    }
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_max_body_size_bytes() -> usize {
    1024 * 1024 // 1 MB
}

fn default_database() -> String {
    "db".to_owned()
}

fn default_collection() -> String {
    "users".to_owned()
}
