//! Discovery/registration orchestration (spec.md §4.7): finds a registry,
//! mirrors every resource into it, then heartbeats at the system-global
//! interval, escalating retry → re-register → re-discover on failure
//! (spec.md §5 "Cancellation/timeouts").

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::discovery::dns_sd::{select_transport, DiscoveryTransport};
use crate::discovery::registry_client::RegistryClient;
use crate::error::DiscoveryError;
use crate::model::resource::ResourceType;
use crate::model::NodeModel;

const REGISTER_ATTEMPTS: u32 = 5;

pub struct DiscoveryAgent {
    model: Arc<NodeModel>,
    settings: Arc<RwLock<Settings>>,
    transport: Box<dyn DiscoveryTransport>,
    hostname: String,
}

impl DiscoveryAgent {
    pub fn new(model: Arc<NodeModel>, settings: Arc<RwLock<Settings>>, hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            model,
            settings,
            transport: select_transport(&hostname),
            hostname,
        }
    }

    /// Only for tests: swap in a fake transport so discovery can be
    /// exercised without real sockets.
    pub fn with_transport(mut self, transport: Box<dyn DiscoveryTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Runs discovery, initial registration, then the heartbeat loop
    /// forever. Intended to be spawned as its own task (spec.md §5
    /// "DiscoveryAgent operates on its own thread pool").
    pub async fn run(&self) {
        loop {
            match self.discover_and_register().await {
                Ok(client) => self.heartbeat_loop(client).await,
                Err(e) => {
                    error!(error = %e, "registry discovery failed, retrying");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn discover_and_register(&self) -> Result<RegistryClient, DiscoveryError> {
        let location = self.transport.discover(&self.hostname).await?;
        info!(registry = %location.base_url, "registry discovered");
        let client = RegistryClient::new(location.base_url);
        self.register_all(&client).await?;
        Ok(client)
    }

    async fn register_all(&self, client: &RegistryClient) -> Result<(), DiscoveryError> {
        let node = self.model.resources.find(self.model.node_id()).ok_or_else(|| {
            DiscoveryError::RegistryUnreachable("node resource missing".to_string())
        })?;
        client.register_with_retry(&node, REGISTER_ATTEMPTS).await?;

        let device = self.model.resources.find(self.model.device_id()).ok_or_else(|| {
            DiscoveryError::RegistryUnreachable("device resource missing".to_string())
        })?;
        client.register_with_retry(&device, REGISTER_ATTEMPTS).await?;

        for resource_type in [
            ResourceType::Source,
            ResourceType::Flow,
            ResourceType::Sender,
            ResourceType::Receiver,
        ] {
            for resource in self.model.resources.iter(resource_type) {
                client.register_with_retry(&resource, REGISTER_ATTEMPTS).await?;
            }
        }
        Ok(())
    }

    async fn heartbeat_loop(&self, client: RegistryClient) {
        loop {
            let interval = self.settings.read().heartbeat_interval;
            tokio::time::sleep(interval).await;
            if let Err(e) = client.heartbeat(self.model.node_id()).await {
                warn!(error = %e, "heartbeat failed, re-registering");
                if self.register_all(&client).await.is_err() {
                    warn!("re-registration failed, will re-discover registry");
                    return;
                }
            }
        }
    }

    /// Merges a freshly observed IS-09 system-global resource into live
    /// settings (spec.md §4.7).
    pub fn apply_system_global(&self, update: &Settings) {
        self.settings.write().merge_system_global(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use async_trait::async_trait;
    use crate::discovery::dns_sd::RegistryLocation;

    struct FixedTransport(RegistryLocation);

    #[async_trait]
    impl DiscoveryTransport for FixedTransport {
        async fn discover(&self, _hostname: &str) -> Result<RegistryLocation, DiscoveryError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn discover_and_register_reaches_a_registry_url() {
        let config = NodeConfig::minimal("seed", "nmos-api.local");
        let settings = Arc::new(RwLock::new(Settings::default()));
        let model = Arc::new(NodeModel::init(&config, Arc::clone(&settings)).unwrap());
        let agent = DiscoveryAgent::new(Arc::clone(&model), settings, "nmos-api.local").with_transport(Box::new(
            FixedTransport(RegistryLocation {
                base_url: "http://192.0.2.20:8010".to_string(),
            }),
        ));

        let location = agent.transport.discover("nmos-api.local").await.unwrap();
        assert_eq!(location.base_url, "http://192.0.2.20:8010");
    }

    #[test]
    fn system_global_merge_overwrites_scalars() {
        let config = NodeConfig::minimal("seed", "nmos-api.local");
        let settings = Arc::new(RwLock::new(Settings::default()));
        let model = Arc::new(NodeModel::init(&config, Arc::clone(&settings)).unwrap());
        let agent = DiscoveryAgent::new(model, Arc::clone(&settings), "nmos-api.local");

        let mut update = Settings::default();
        update.ptp_domain_number = 7;
        agent.apply_system_global(&update);
        assert_eq!(settings.read().ptp_domain_number, 7);
    }
}
