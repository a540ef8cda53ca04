//! The public embedding API (spec.md §4.8): a safe Rust surface plus a thin
//! `extern "C"` shim ([`ffi`]) for non-Rust hosts.

pub mod ffi;
pub mod logging;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing_subscriber::layer::SubscriberExt;
use uuid::Uuid;

use crate::config::{NodeConfig, Settings};
use crate::connection::{ActivationCallback, ConnectionEngine};
use crate::discovery::DiscoveryAgent;
use crate::error::{NodeError, Result};
use crate::facade::logging::{HostCallbackLayer, LogCallback};
use crate::model::NodeModel;

/// A running node: resource model, connection engine, HTTP surface, and
/// discovery agent, all owned together (spec.md §4.8).
pub struct NmosNode {
    model: Arc<NodeModel>,
    engine: Arc<ConnectionEngine>,
    settings: Arc<RwLock<Settings>>,
    runtime: tokio::runtime::Runtime,
    http_handle: tokio::task::JoinHandle<()>,
    discovery_handle: tokio::task::JoinHandle<()>,
}

impl NmosNode {
    /// `create(config)` (spec.md §6): validates preconditions, wires up
    /// the resource model, HTTP surface, and discovery agent, and starts
    /// them on a dedicated Tokio runtime.
    pub fn create(
        config: NodeConfig,
        on_activate: impl Fn(&str, &str) + Send + Sync + 'static,
        log_callback: Option<LogCallback>,
    ) -> Result<Self> {
        if config.hostname.is_empty() {
            return Err(NodeError::InvalidArgument("hostname must not be empty"));
        }
        if config.seed.is_empty() {
            return Err(NodeError::InvalidArgument("seed must not be empty"));
        }

        if let Some(cb) = log_callback {
            let layer = HostCallbackLayer::new(cb, config.log_level, config.log_categories.clone());
            let subscriber = tracing_subscriber::Registry::default().with(layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
        }

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|_| NodeError::InvalidArgument("failed to start async runtime"))?;

        let settings = Arc::new(RwLock::new(Settings::default()));
        let model = Arc::new(NodeModel::init(&config, Arc::clone(&settings))?);

        for sdp in &config.initial_senders {
            model.add_sender(sdp)?;
        }
        for sdp in &config.initial_receivers {
            model.add_receiver(sdp)?;
        }

        let activation_callback: ActivationCallback = Arc::new(on_activate);
        let engine = ConnectionEngine::new(
            Arc::clone(&model.resources),
            Arc::clone(&model.connections),
            Arc::clone(&settings),
            activation_callback,
        );

        let router = crate::api::router(Arc::clone(&model), Arc::clone(&engine));
        let bind_addr = format!("0.0.0.0:{}", config.http_port);
        let http_handle = runtime.spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
                Ok(listener) => listener,
                Err(error) => {
                    tracing::error!(%error, "failed to bind NodeAPI listener");
                    return;
                }
            };
            if let Err(error) = axum::serve(listener, router.into_make_service()).await {
                tracing::error!(%error, "NodeAPI server exited");
            }
        });

        let agent = DiscoveryAgent::new(Arc::clone(&model), Arc::clone(&settings), config.hostname.clone());
        let discovery_handle = runtime.spawn(async move {
            agent.run().await;
        });

        Ok(Self {
            model,
            engine,
            settings,
            runtime,
            http_handle,
            discovery_handle,
        })
    }

    /// `destroy(handle)` (spec.md §6): stops the HTTP server and discovery
    /// loop and releases the runtime.
    pub fn destroy(self) {
        self.http_handle.abort();
        self.discovery_handle.abort();
        self.runtime.shutdown_background();
    }

    pub fn add_sender(&self, sdp: &str) -> Result<Uuid> {
        Ok(self.model.add_sender(sdp)?)
    }

    pub fn remove_sender(&self, internal_id: &str) -> Result<()> {
        Ok(self.model.remove_sender(internal_id)?)
    }

    pub fn add_receiver(&self, sdp: &str) -> Result<Uuid> {
        Ok(self.model.add_receiver(sdp)?)
    }

    pub fn remove_receiver(&self, internal_id: &str) -> Result<()> {
        Ok(self.model.remove_receiver(internal_id)?)
    }

    /// `activate(handle, id, sdp)` (spec.md §6): host-initiated activation,
    /// identified by `internal_id` rather than the IS-05 resource UUID.
    pub fn activate(&self, internal_id: &str, sdp: &str) -> Result<()> {
        Ok(self.engine.host_activate(internal_id, sdp)?)
    }

    pub fn settings(&self) -> Arc<RwLock<Settings>> {
        Arc::clone(&self.settings)
    }
}
