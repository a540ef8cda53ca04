//! Registry mirroring over HTTP (spec.md §4.7): register every resource,
//! then heartbeat at the system-global interval, retrying with exponential
//! backoff on failure, mirroring `rvoip-client-core`'s REST registration
//! client use of `reqwest`.

use std::time::Duration;

use serde_json::json;

use crate::error::DiscoveryError;
use crate::model::resource::{Resource, ResourceType};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /x-nmos/registration/v1.3/resource` (IS-04 registration API).
    pub async fn register(&self, resource: &Resource) -> Result<(), DiscoveryError> {
        let url = format!("{}/x-nmos/registration/v1.3/resource", self.base_url);
        let body = json!({
            "type": resource_type_wire(resource.resource_type),
            "data": resource,
        });
        let resp = self.http.post(url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(DiscoveryError::RegistryUnreachable(format!("register returned {}", resp.status())));
        }
        Ok(())
    }

    /// `POST /x-nmos/registration/v1.3/health/nodes/{id}` (heartbeat).
    pub async fn heartbeat(&self, node_id: uuid::Uuid) -> Result<(), DiscoveryError> {
        let url = format!("{}/x-nmos/registration/v1.3/health/nodes/{}", self.base_url, node_id);
        let resp = self.http.post(url).send().await?;
        if !resp.status().is_success() {
            return Err(DiscoveryError::RegistryUnreachable(format!("heartbeat returned {}", resp.status())));
        }
        Ok(())
    }

    /// Registers with exponential backoff, doubling up to [`MAX_BACKOFF`],
    /// per spec.md §5 "retry → re-register → re-discover".
    pub async fn register_with_retry(&self, resource: &Resource, max_attempts: u32) -> Result<(), DiscoveryError> {
        let mut delay = Duration::from_millis(250);
        let mut last_err = None;
        for _ in 0..max_attempts {
            match self.register(resource).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_err = Some(e);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| DiscoveryError::RegistryUnreachable(self.base_url.clone())))
    }
}

fn resource_type_wire(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Node => "node",
        ResourceType::Device => "device",
        ResourceType::Source => "source",
        ResourceType::Flow => "flow",
        ResourceType::Sender => "sender",
        ResourceType::Receiver => "receiver",
        ResourceType::ConnectionSender | ResourceType::ConnectionReceiver => "",
    }
}
