//! The staged/active connection-management state machine (spec.md §4.5).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::Settings;
use crate::connection::{auto, transportfile};
use crate::error::ConnectionError;
use crate::model::resource::{ResourceBody, ResourceType};
use crate::model::store::ResourceStore;
use crate::model::types::{ActivationMode, ActivationRecord, EndpointParams};
use crate::sdp::parser::parse as parse_sdp;
use crate::sdp::types::Role;

/// Callback invoked with `(internal_id, internal-form SDP or empty on
/// deactivation)` whenever a sender/receiver crosses the active boundary
/// (spec.md §4.5 "Activation callback"). Invoked after the store write lock
/// is released — see DESIGN.md for why this departs from the literal
/// "invoked while holding the lock" wording of spec.md §9.
pub type ActivationCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Body of a PATCH `/staged` request (spec.md §4.5). Only schema-shape
/// validation is performed; any field conforming to the IS-05 shape is
/// accepted, including the literal string `"auto"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagedPatch {
    pub master_enable: Option<bool>,
    pub activation: Option<ActivationRecord>,
    pub transport_params: Option<Vec<Map<String, Value>>>,
}

pub struct ConnectionEngine {
    resources: Arc<ResourceStore>,
    connections: Arc<ResourceStore>,
    settings: Arc<RwLock<Settings>>,
    on_activate: ActivationCallback,
    scheduled: Mutex<HashMap<Uuid, watch::Sender<bool>>>,
}

impl ConnectionEngine {
    pub fn new(
        resources: Arc<ResourceStore>,
        connections: Arc<ResourceStore>,
        settings: Arc<RwLock<Settings>>,
        on_activate: ActivationCallback,
    ) -> Arc<Self> {
        Arc::new(Self {
            resources,
            connections,
            settings,
            on_activate,
            scheduled: Mutex::new(HashMap::new()),
        })
    }

    /// PATCH `/staged` (spec.md §4.5): merges into the prior staged state.
    pub fn patch_staged(&self, id: Uuid, patch: &StagedPatch) -> Result<(), ConnectionError> {
        let current = self
            .connections
            .find(id)
            .ok_or_else(|| ConnectionError::UnknownResource(id.to_string()))?;
        let expected_legs = match &current.data {
            ResourceBody::ConnectionSender(b) => b.endpoint_staged.transport_params.len(),
            ResourceBody::ConnectionReceiver(b) => b.endpoint_staged.transport_params.len(),
            _ => return Err(ConnectionError::UnknownResource(id.to_string())),
        };
        if let Some(tp) = &patch.transport_params {
            if tp.len() != expected_legs {
                return Err(ConnectionError::LegCountMismatch {
                    got: tp.len(),
                    expected: expected_legs,
                });
            }
        }

        self.connections
            .modify(id, |resource| apply_staged_patch(resource, patch))
            .map_err(|_| ConnectionError::UnknownResource(id.to_string()))?;

        if let Some(activation) = &patch.activation {
            if activation.mode.is_none() {
                self.cancel_scheduled(id);
            }
        }
        Ok(())
    }

    /// Promotes the current staged state to active (spec.md §4.5
    /// "Activation"): copies staged into active, runs the auto resolver,
    /// re-synthesizes the transport file for a sender, bumps the version,
    /// then — after the write lock is released — invokes the host callback.
    pub fn activate_now(&self, id: Uuid) -> Result<(), ConnectionError> {
        self.cancel_scheduled(id);
        let (internal_id, callback_sdp) = self.promote_to_active(id)?;
        (self.on_activate)(&internal_id, &callback_sdp);
        Ok(())
    }

    /// Schedules activation for `deadline`, cancellable by a later call to
    /// [`Self::cancel_scheduled`] or by another `patch_staged` that clears
    /// the scheduled mode (spec.md §5 "Cancellation/timeouts").
    pub fn schedule_activation(self: &Arc<Self>, id: Uuid, deadline: tokio::time::Instant) {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.scheduled.lock().insert(id, cancel_tx);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = engine.activate_now(id);
                }
                _ = cancel_rx.changed() => {}
            }
            engine.scheduled.lock().remove(&id);
        });
    }

    pub fn cancel_scheduled(&self, id: Uuid) {
        if let Some(tx) = self.scheduled.lock().remove(&id) {
            let _ = tx.send(true);
        }
    }

    /// Host-initiated `activate` (spec.md §4.5): a non-IS-05 path identified
    /// by `internal_id` rather than the connection resource's UUID. An empty
    /// `sdp` means deactivate.
    pub fn host_activate(&self, internal_id: &str, sdp: &str) -> Result<(), ConnectionError> {
        let (id, is_sender) = self
            .find_by_internal_id(internal_id)
            .ok_or_else(|| ConnectionError::UnknownResource(internal_id.to_string()))?;

        self.cancel_scheduled(id);

        if sdp.is_empty() {
            self.connections.modify(id, |resource| {
                let endpoint = active_endpoint_mut(resource);
                if let Some(endpoint) = endpoint {
                    endpoint.master_enable = false;
                }
            }).map_err(|_| ConnectionError::UnknownResource(id.to_string()))?;
        } else {
            let role = if is_sender { Role::Sender } else { Role::Receiver };
            let parsed = parse_sdp(sdp, role)?;
            let params: Vec<Map<String, Value>> = if is_sender {
                parsed.legs.iter().map(crate::model::node_model::sender_leg_transport_params).collect()
            } else {
                parsed.legs.iter().map(crate::model::node_model::receiver_leg_transport_params).collect()
            };
            self.connections.modify(id, |resource| {
                match &mut resource.data {
                    ResourceBody::ConnectionSender(b) => {
                        b.endpoint_active.master_enable = true;
                        b.endpoint_active.transport_params = params;
                    }
                    ResourceBody::ConnectionReceiver(b) => {
                        b.endpoint_active.master_enable = true;
                        b.endpoint_active.transport_params = params;
                        b.transport_file_staged = Some(sdp.to_string());
                    }
                    _ => {}
                }
            }).map_err(|_| ConnectionError::UnknownResource(id.to_string()))?;
        }

        if is_sender {
            self.refresh_transport_file(id)?;
        }

        let callback_sdp = self.render_active_sdp(id).unwrap_or_default();
        (self.on_activate)(internal_id, &callback_sdp);
        Ok(())
    }

    fn find_by_internal_id(&self, internal_id: &str) -> Option<(Uuid, bool)> {
        for sender in self.resources.iter(ResourceType::Sender) {
            if sender.tags.get("urn:x-nvnmos:id").map(|v| v.iter().any(|t| t == internal_id)).unwrap_or(false) {
                return Some((sender.id, true));
            }
        }
        for receiver in self.resources.iter(ResourceType::Receiver) {
            if receiver.tags.get("urn:x-nvnmos:id").map(|v| v.iter().any(|t| t == internal_id)).unwrap_or(false) {
                return Some((receiver.id, false));
            }
        }
        None
    }

    fn refresh_transport_file(&self, id: Uuid) -> Result<(), ConnectionError> {
        self.connections
            .modify(id, |resource| {
                if let ResourceBody::ConnectionSender(b) = &mut resource.data {
                    let file = transportfile::synthesize_transport_file(&b.sdp_skeleton, &b.endpoint_active.transport_params);
                    b.transport_file_cache = Some(file);
                }
            })
            .map_err(|_| ConnectionError::UnknownResource(id.to_string()))?;
        Ok(())
    }

    fn render_active_sdp(&self, id: Uuid) -> Option<String> {
        let resource = self.connections.find(id)?;
        match resource.data {
            ResourceBody::ConnectionSender(b) if b.endpoint_active.master_enable => {
                Some(transportfile::synthesize_internal(&b.sdp_skeleton, &b.endpoint_active.transport_params))
            }
            ResourceBody::ConnectionReceiver(b) if b.endpoint_active.master_enable => {
                Some(transportfile::synthesize_internal(&b.sdp_skeleton, &b.endpoint_active.transport_params))
            }
            _ => Some(String::new()),
        }
    }

    /// The shared core of activation: copy staged into active, run the auto
    /// resolver, refresh the sender transport file. Returns the internal id
    /// and the internal-form SDP to hand to the host callback.
    fn promote_to_active(&self, id: Uuid) -> Result<(String, String), ConnectionError> {
        let internal_id = self
            .connections
            .find(id)
            .map(|r| r.label)
            .ok_or_else(|| ConnectionError::UnknownResource(id.to_string()))?;

        let sender_interface_bindings = self.interface_bindings(id, true);
        let receiver_interface_bindings = self.interface_bindings(id, false);

        self.connections
            .modify(id, |resource| match &mut resource.data {
                ResourceBody::ConnectionSender(b) => {
                    let mut params = b.endpoint_staged.transport_params.clone();
                    if let Some(bindings) = &sender_interface_bindings {
                        auto::resolve_sender(&mut params, id, bindings);
                    }
                    b.endpoint_active = EndpointParams {
                        master_enable: b.endpoint_staged.master_enable,
                        activation: b.endpoint_staged.activation.clone(),
                        transport_params: params,
                    };
                    b.transport_file_cache =
                        Some(transportfile::synthesize_transport_file(&b.sdp_skeleton, &b.endpoint_active.transport_params));
                }
                ResourceBody::ConnectionReceiver(b) => {
                    let mut params = b.endpoint_staged.transport_params.clone();
                    if let Some(bindings) = &receiver_interface_bindings {
                        auto::resolve_receiver(&mut params, bindings);
                    }
                    b.endpoint_active = EndpointParams {
                        master_enable: b.endpoint_staged.master_enable,
                        activation: b.endpoint_staged.activation.clone(),
                        transport_params: params,
                    };
                }
                _ => {}
            })
            .map_err(|_| ConnectionError::UnknownResource(id.to_string()))?;

        let sdp = self.render_active_sdp(id).unwrap_or_default();
        Ok((internal_id, sdp))
    }

    fn interface_bindings(&self, id: Uuid, for_sender: bool) -> Option<Vec<String>> {
        let resource = self.resources.find(id)?;
        match resource.data {
            ResourceBody::Sender(b) if for_sender => Some(b.interface_bindings),
            ResourceBody::Receiver(b) if !for_sender => Some(b.interface_bindings),
            _ => None,
        }
    }
}

fn active_endpoint_mut(resource: &mut crate::model::resource::Resource) -> Option<&mut EndpointParams> {
    match &mut resource.data {
        ResourceBody::ConnectionSender(b) => Some(&mut b.endpoint_active),
        ResourceBody::ConnectionReceiver(b) => Some(&mut b.endpoint_active),
        _ => None,
    }
}

fn apply_staged_patch(resource: &mut crate::model::resource::Resource, patch: &StagedPatch) {
    let endpoint = match &mut resource.data {
        ResourceBody::ConnectionSender(b) => &mut b.endpoint_staged,
        ResourceBody::ConnectionReceiver(b) => &mut b.endpoint_staged,
        _ => return,
    };
    if let Some(master_enable) = patch.master_enable {
        endpoint.master_enable = master_enable;
    }
    if let Some(activation) = &patch.activation {
        endpoint.activation = activation.clone();
    }
    if let Some(transport_params) = &patch.transport_params {
        for (leg, patch_leg) in endpoint.transport_params.iter_mut().zip(transport_params.iter()) {
            for (k, v) in patch_leg {
                leg.insert(k.clone(), v.clone());
            }
        }
    }
}

/// Derives the [`tokio::time::Instant`] deadline for a scheduled activation
/// mode (spec.md §9: "expose the clock as a seam for tests").
pub trait Clock: Send + Sync {
    fn now(&self) -> tokio::time::Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> tokio::time::Instant {
        tokio::time::Instant::now()
    }
}

pub fn deadline_for(clock: &dyn Clock, mode: ActivationMode, requested_time: Option<&str>) -> tokio::time::Instant {
    match mode {
        ActivationMode::ActivateImmediate => clock.now(),
        ActivationMode::ActivateScheduledRelative => {
            let secs: f64 = requested_time.and_then(|s| s.parse().ok()).unwrap_or(0.0);
            clock.now() + std::time::Duration::from_secs_f64(secs.max(0.0))
        }
        ActivationMode::ActivateScheduledAbsolute => clock.now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resource::{Resource, ResourceBody, ResourceType, Version};
    use crate::model::types::ConnectionSenderBody;
    use crate::sdp::parser::parse;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=mediaclk:direct=0\r\n";

    fn engine_with_sender() -> (Arc<ConnectionEngine>, Uuid, Arc<AtomicUsize>) {
        let resources = ResourceStore::new();
        let connections = ResourceStore::new();
        let skeleton = parse(VIDEO_SDP, Role::Sender).unwrap();
        let sender_id = Uuid::new_v4();

        let mut tags = HashMap::new();
        tags.insert("urn:x-nvnmos:id".to_string(), vec!["sink-0".to_string()]);
        resources.insert(Resource {
            id: sender_id,
            resource_type: ResourceType::Sender,
            version: Version::now(),
            label: "sink-0".to_string(),
            description: String::new(),
            tags,
            data: ResourceBody::Sender(crate::model::types::SenderBody {
                transport: "urn:x-nmos:transport:rtp".to_string(),
                flow_id: Uuid::new_v4(),
                interface_bindings: vec!["192.0.2.10".to_string()],
                manifest_href: String::new(),
            }),
        });

        let params = vec![crate::model::node_model::sender_leg_transport_params(&skeleton.legs[0])];
        connections.insert(Resource {
            id: sender_id,
            resource_type: ResourceType::ConnectionSender,
            version: Version::now(),
            label: "sink-0".to_string(),
            description: String::new(),
            tags: HashMap::new(),
            data: ResourceBody::ConnectionSender(ConnectionSenderBody {
                endpoint_staged: EndpointParams {
                    master_enable: true,
                    activation: Default::default(),
                    transport_params: params.clone(),
                },
                endpoint_active: EndpointParams {
                    master_enable: false,
                    activation: Default::default(),
                    transport_params: params,
                },
                transport_file_cache: None,
                sdp_skeleton: skeleton,
            }),
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let settings = Arc::new(RwLock::new(Settings::default()));
        let engine = ConnectionEngine::new(
            resources,
            connections,
            settings,
            Arc::new(move |_id: &str, _sdp: &str| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (engine, sender_id, calls)
    }

    #[test]
    fn activate_resolves_auto_and_invokes_callback() {
        let (engine, sender_id, calls) = engine_with_sender();
        engine.activate_now(sender_id).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let resource = engine.connections.find(sender_id).unwrap();
        let ResourceBody::ConnectionSender(body) = resource.data else { panic!() };
        assert!(body.endpoint_active.master_enable);
        assert_eq!(body.endpoint_active.transport_params[0]["destination_ip"], json!("233.252.0.0"));
        let file = body.transport_file_cache.unwrap();
        assert!(!file.contains("x-nvnmos"));
    }

    #[test]
    fn activate_then_deactivate_is_idempotent_on_master_enable() {
        let (engine, sender_id, _calls) = engine_with_sender();
        engine.activate_now(sender_id).unwrap();
        engine
            .patch_staged(
                sender_id,
                &StagedPatch {
                    master_enable: Some(false),
                    activation: None,
                    transport_params: None,
                },
            )
            .unwrap();
        engine.activate_now(sender_id).unwrap();
        let resource = engine.connections.find(sender_id).unwrap();
        let ResourceBody::ConnectionSender(body) = resource.data else { panic!() };
        assert!(!body.endpoint_active.master_enable);
    }

    #[test]
    fn leg_count_mismatch_is_rejected() {
        let (engine, sender_id, _calls) = engine_with_sender();
        let result = engine.patch_staged(
            sender_id,
            &StagedPatch {
                master_enable: None,
                activation: None,
                transport_params: Some(vec![Map::new(), Map::new()]),
            },
        );
        assert!(matches!(result, Err(ConnectionError::LegCountMismatch { got: 2, expected: 1 })));
    }
}
