//! Registry discovery and mirroring (spec.md §4.7).

pub mod agent;
pub mod dns_sd;
pub mod registry_client;

pub use agent::DiscoveryAgent;
