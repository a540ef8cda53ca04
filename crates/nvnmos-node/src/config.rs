//! Embedding configuration (spec.md §6) and the mutable [`Settings`] object
//! DiscoveryAgent keeps current against IS-09 system-global updates
//! (spec.md §4.7).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Manufacturer/product/instance asset tags carried on the Device resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetTags {
    /// Device manufacturer, e.g. `"Acme Broadcast"`.
    pub manufacturer: String,
    /// Product name.
    pub product: String,
    /// Instance identifier, unique among devices of the same product.
    pub instance_id: String,
    /// Supported BCP-002-01 "functions" tag values.
    pub functions: Vec<String>,
}

/// Numeric log level, matching spec.md §6 exactly
/// (fatal=40, severe=30, error=20, warning=10, info=0, verbose=-10, devel=-40).
pub type LogLevel = i32;

pub const LOG_FATAL: LogLevel = 40;
pub const LOG_SEVERE: LogLevel = 30;
pub const LOG_ERROR: LogLevel = 20;
pub const LOG_WARNING: LogLevel = 10;
pub const LOG_INFO: LogLevel = 0;
pub const LOG_VERBOSE: LogLevel = -10;
pub const LOG_DEVEL: LogLevel = -40;

/// Configuration supplied at `create()` time (spec.md §6 "Embedding API").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node hostname, e.g. `"nmos-api.local"` or an FQDN for unicast DNS-SD.
    pub hostname: String,
    /// Host IPv4 addresses available for interface binding.
    pub host_addresses: Vec<String>,
    /// HTTP port the NodeAPI listens on.
    pub http_port: u16,
    /// Human-readable node/device label.
    pub label: String,
    /// Node/device description.
    pub description: String,
    /// Manufacturer/product/instance asset tags.
    pub asset_tags: AssetTags,
    /// Seed string IdGen derives every resource UUID from (spec.md §4.1, §3
    /// "Identity").
    pub seed: String,
    /// SDP payloads for senders to create at startup.
    pub initial_senders: Vec<String>,
    /// SDP payloads for receivers to create at startup.
    pub initial_receivers: Vec<String>,
    /// Minimum severity (spec.md §6 numeric scale) the log callback should
    /// receive.
    pub log_level: LogLevel,
    /// Category allow-list for the log callback; empty means all
    /// categories.
    pub log_categories: Vec<String>,
}

impl NodeConfig {
    /// A config with no initial senders/receivers and a single loopback
    /// interface, useful for tests and the demo driver.
    pub fn minimal(seed: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            host_addresses: Vec::new(),
            http_port: 8080,
            label: "nvnmos-node".to_string(),
            description: String::new(),
            asset_tags: AssetTags::default(),
            seed: seed.into(),
            initial_senders: Vec::new(),
            initial_receivers: Vec::new(),
            log_level: LOG_INFO,
            log_categories: Vec::new(),
        }
    }
}

/// Live, mergeable settings. Distinct from [`NodeConfig`] because
/// DiscoveryAgent shallow-merges IS-09 system-global resources into this
/// object at runtime (spec.md §4.7) while `NodeConfig` is the immutable
/// snapshot supplied at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Registry heartbeat interval.
    #[serde(with = "duration_secs")]
    pub heartbeat_interval: Duration,
    /// PTP domain number carried forward onto PTP clocks (spec.md §4.4
    /// "Clock maintenance").
    pub ptp_domain_number: u8,
    /// Arbitrary system-global scalars not otherwise modeled, kept for
    /// forward compatibility with IS-09 fields this node does not interpret.
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            ptp_domain_number: 0,
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Shallow merge of a freshly observed IS-09 system-global resource
    /// into these live settings (spec.md §4.7): scalar fields are simply
    /// overwritten by `update`, and `extra` entries are replaced key by key
    /// rather than merged recursively.
    pub fn merge_system_global(&mut self, update: &Settings) {
        self.heartbeat_interval = update.heartbeat_interval;
        self.ptp_domain_number = update.ptp_domain_number;
        for (k, v) in &update.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
