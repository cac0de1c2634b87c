//! Service configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```
//! use sourced_ordering::config::ServiceConfig;
//!
//! let config = ServiceConfig::from_json(r#"{ "snapshot_frequency": 10 }"#).unwrap();
//! assert_eq!(config.snapshot_frequency, 10);
//! assert_eq!(config.command_group, "ordering-commands");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ordering::contracts::{BASKETS_GROUP, COMMAND_GROUP, DEPOT_GROUP};
use crate::outbox::ProcessorConfig;
use crate::uow::DEFAULT_SNAPSHOT_FREQUENCY;

const DEFAULT_SERVICE_NAME: &str = "ordering";
const DEFAULT_TRANSPORT_POLL_MS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Versions between snapshots; `0` disables snapshots.
    #[serde(default = "default_snapshot_frequency")]
    pub snapshot_frequency: u64,

    #[serde(default = "default_command_group")]
    pub command_group: String,

    #[serde(default = "default_baskets_group")]
    pub baskets_group: String,

    #[serde(default = "default_depot_group")]
    pub depot_group: String,

    /// Poll timeout of the bus transports.
    #[serde(default = "default_transport_poll")]
    pub transport_poll_ms: u64,

    #[serde(default)]
    pub processor: ProcessorConfig,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_snapshot_frequency() -> u64 {
    DEFAULT_SNAPSHOT_FREQUENCY
}

fn default_command_group() -> String {
    COMMAND_GROUP.to_string()
}

fn default_baskets_group() -> String {
    BASKETS_GROUP.to_string()
}

fn default_depot_group() -> String {
    DEPOT_GROUP.to_string()
}

fn default_transport_poll() -> u64 {
    DEFAULT_TRANSPORT_POLL_MS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            snapshot_frequency: DEFAULT_SNAPSHOT_FREQUENCY,
            command_group: default_command_group(),
            baskets_group: default_baskets_group(),
            depot_group: default_depot_group(),
            transport_poll_ms: DEFAULT_TRANSPORT_POLL_MS,
            processor: ProcessorConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn transport_poll_interval(&self) -> Duration {
        Duration::from_millis(self.transport_poll_ms)
    }
}
