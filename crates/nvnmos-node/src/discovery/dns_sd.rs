//! Registry discovery transports (spec.md §4.7): mDNS multicast browse for
//! `.local` hostnames, unicast DNS-SD SRV lookup otherwise. Both sit behind
//! one trait so [`crate::discovery::agent::DiscoveryAgent`] can be driven by
//! a fake transport in tests, the same "defined interface" role
//! `rvoip-client-core`'s registration transport trait plays for its SIP
//! client.

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use mdns_sd::{ServiceDaemon, ServiceEvent};

use crate::error::DiscoveryError;

const MULTICAST_SERVICE: &str = "_nmos-registration._tcp.local.";
const UNICAST_SERVICE_PREFIX: &str = "_nmos-register._tcp";
const BROWSE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// A discovered registry's base URL, e.g. `http://192.0.2.20:8010`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLocation {
    pub base_url: String,
}

#[async_trait]
pub trait DiscoveryTransport: Send + Sync {
    async fn discover(&self, hostname: &str) -> Result<RegistryLocation, DiscoveryError>;

    /// Used only to make the transport selection rule testable without
    /// real sockets.
    fn name(&self) -> &'static str;
}

/// Selects the transport per spec.md §4.7's hostname-shape rule.
pub fn select_transport(hostname: &str) -> Box<dyn DiscoveryTransport> {
    if hostname.ends_with(".local") {
        Box::new(MulticastTransport)
    } else {
        Box::new(UnicastTransport)
    }
}

pub struct MulticastTransport;

#[async_trait]
impl DiscoveryTransport for MulticastTransport {
    async fn discover(&self, hostname: &str) -> Result<RegistryLocation, DiscoveryError> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| DiscoveryError::RegistryUnreachable(e.to_string()))?;
        let receiver = daemon
            .browse(MULTICAST_SERVICE)
            .map_err(|e| DiscoveryError::RegistryUnreachable(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + BROWSE_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(BROWSE_TIMEOUT, async { receiver.recv_async().await }).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    if let Some(addr) = info.get_addresses().iter().next() {
                        return Ok(RegistryLocation {
                            base_url: format!("http://{}:{}", addr, info.get_port()),
                        });
                    }
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        let _ = daemon.shutdown();
        Err(DiscoveryError::NoRegistryFound(hostname.to_string()))
    }

    fn name(&self) -> &'static str {
        "multicast"
    }
}

pub struct UnicastTransport;

#[async_trait]
impl DiscoveryTransport for UnicastTransport {
    async fn discover(&self, hostname: &str) -> Result<RegistryLocation, DiscoveryError> {
        let domain = hostname.splitn(2, '.').nth(1).unwrap_or(hostname);
        let query = format!("{UNICAST_SERVICE_PREFIX}.{domain}.");

        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        let srv = resolver
            .srv_lookup(query.clone())
            .await
            .map_err(|_| DiscoveryError::NoRegistryFound(hostname.to_string()))?;
        let record = srv.iter().next().ok_or_else(|| DiscoveryError::NoRegistryFound(hostname.to_string()))?;
        let target = record.target().to_utf8();
        let lookup = resolver
            .lookup_ip(target.clone())
            .await
            .map_err(|_| DiscoveryError::NoRegistryFound(hostname.to_string()))?;
        let addr = lookup.iter().next().ok_or_else(|| DiscoveryError::NoRegistryFound(hostname.to_string()))?;
        Ok(RegistryLocation {
            base_url: format!("http://{}:{}", addr, record.port()),
        })
    }

    fn name(&self) -> &'static str {
        "unicast"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_hostname_selects_multicast() {
        assert_eq!(select_transport("nmos-api.local").name(), "multicast");
    }

    #[test]
    fn fqdn_hostname_selects_unicast() {
        assert_eq!(select_transport("nmos-api.example.com").name(), "unicast");
    }
}
