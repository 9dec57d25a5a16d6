//! Service settings loaded from `USERS_*` environment variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Which user store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub bind_address: String,
    pub store: StoreBackend,
    /// Library events that can wait for the listener before senders block
    pub event_queue_capacity: usize,
}

impl Settings {
    /// Load settings
    ///
    /// # Environment Variables
    /// - `USERS_BIND_ADDRESS`: listen address (default: "0.0.0.0:3002")
    /// - `USERS_STORE`: `postgres` or `memory` (default: "postgres")
    /// - `USERS_EVENT_QUEUE_CAPACITY`: library event queue size (default: 64)
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_address", "0.0.0.0:3002")?
            .set_default("store", "postgres")?
            .set_default("event_queue_capacity", 64)?
            .add_source(Environment::with_prefix("USERS"))
            .build()?
            .try_deserialize()
    }
}
