//! # Geofencer Configuration
//!
//! Typed configuration for the watch-list pipeline. Values are layered from
//! `config/geofencer.toml`, an optional `config/geofencer.<environment>.toml`
//! override and `GEOFENCER__`-prefixed environment variables; every section has
//! serde defaults so partial files are valid.
//!
//! ```rust,no_run
//! use geofencer_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let timeout = manager.config().executor.command_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_TRANSITION_RECEIVER,
};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofencerConfig {
    pub executor: ExecutorConfig,
    pub store: StoreConfig,
    pub events: EventsConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

/// Command executor settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Upper bound on one command's connect + operation time; `None` waits forever
    pub command_timeout_ms: Option<u64>,
}

impl ExecutorConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }
}

/// Watch-list persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast buffer for transition events; slow subscribers lag past this
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Receiver name handed to the service as the transition delivery target
    pub transition_receiver: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            transition_receiver: DEFAULT_TRANSITION_RECEIVER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: Option<String>,
    pub json: bool,
}

impl GeofencerConfig {
    /// Reject values that would leave the pipeline unusable
    pub fn validate(&self) -> ConfigResult<()> {
        if self.executor.command_timeout_ms == Some(0) {
            return Err(ConfigurationError::invalid(
                "executor.command_timeout_ms",
                "must be greater than zero when set",
            ));
        }

        if self.store.database_url.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "store.database_url",
                "must not be empty",
            ));
        }

        if self.store.max_connections == 0 {
            return Err(ConfigurationError::invalid(
                "store.max_connections",
                "must be greater than zero",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid(
                "events.channel_capacity",
                "must be greater than zero",
            ));
        }

        if self.service.transition_receiver.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "service.transition_receiver",
                "must not be empty",
            ));
        }

        Ok(())
    }
}
