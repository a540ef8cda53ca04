//! Business rules over [`ResourceStore`] (spec.md §4.4): sender/receiver
//! bundle lifecycle, node interface/clock maintenance, receiver capability
//! constraint sets.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::{AssetTags, NodeConfig, Settings};
use crate::error::ModelError;
use crate::idgen::{self, IdKind};
use crate::model::resource::{Resource, ResourceBody, ResourceType, Version};
use crate::model::store::ResourceStore;
use crate::model::types::{
    ChannelInfo, ConnectionReceiverBody, ConnectionSenderBody, ConstraintParam, ConstraintSet,
    ControlRef, DeviceBody, EndpointParams, FlowBody, NodeBody, ReceiverBody, ReceiverCaps,
    SenderBody, SourceBody,
};
use crate::sdp::clock::{derive_clock, NodeClock};
use crate::sdp::types::{MediaFormat, MediaLeg, ParsedSdp, Role};

const TAG_INTERNAL_ID: &str = "urn:x-nvnmos:id";
const CLOCK_NAME: &str = "clk0";

pub struct NodeModel {
    pub resources: Arc<ResourceStore>,
    pub connections: Arc<ResourceStore>,
    settings: Arc<RwLock<Settings>>,
    seed: String,
    hostname: String,
    http_port: u16,
    known_interfaces: Vec<String>,
    node_id: Uuid,
    device_id: Uuid,
}

impl NodeModel {
    /// `init()` (spec.md §4.4): materialises node and device from settings.
    pub fn init(config: &NodeConfig, settings: Arc<RwLock<Settings>>) -> Result<Self, ModelError> {
        let resources = ResourceStore::new();
        let connections = ResourceStore::new();

        let node_id = idgen::id(&config.seed, IdKind::Node, "");
        let device_id = idgen::id(&config.seed, IdKind::Device, "");
        let href = format!("http://{}:{}/", config.hostname, config.http_port);

        resources.insert(Resource {
            id: node_id,
            resource_type: ResourceType::Node,
            version: Version::now(),
            label: config.label.clone(),
            description: config.description.clone(),
            tags: HashMap::new(),
            data: ResourceBody::Node(NodeBody {
                interfaces: Vec::new(),
                clocks: vec![NodeClock::Internal {
                    name: CLOCK_NAME.to_string(),
                }],
                hostname: config.hostname.clone(),
                href: href.clone(),
                services: Vec::new(),
            }),
        });

        resources.insert(Resource {
            id: device_id,
            resource_type: ResourceType::Device,
            version: Version::now(),
            label: format!("{} device", config.label),
            description: String::new(),
            tags: asset_tags_to_tags(&config.asset_tags),
            data: ResourceBody::Device(DeviceBody {
                device_type: "urn:x-nmos:device:generic".to_string(),
                controls: vec![ControlRef {
                    href: format!("{href}x-nmos/connection/v1.1/"),
                    control_type: "urn:x-nmos:control:sr-ctrl/v1.1".to_string(),
                }],
                senders: Vec::new(),
                receivers: Vec::new(),
            }),
        });

        Ok(Self {
            resources,
            connections,
            settings,
            seed: config.seed.clone(),
            hostname: config.hostname.clone(),
            http_port: config.http_port,
            known_interfaces: config.host_addresses.clone(),
            node_id,
            device_id,
        })
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn device_id(&self) -> Uuid {
        self.device_id
    }

    fn find_by_internal_id(&self, resource_type: ResourceType, internal_id: &str) -> Option<Resource> {
        self.resources
            .iter(resource_type)
            .into_iter()
            .find(|r| r.tags.get(TAG_INTERNAL_ID).map(|v| v.iter().any(|t| t == internal_id)).unwrap_or(false))
    }

    /// `add_sender(sdp)` (spec.md §4.4).
    pub fn add_sender(&self, sdp_text: &str) -> Result<Uuid, ModelError> {
        let parsed = crate::sdp::parser::parse(sdp_text, Role::Sender)?;
        let internal_id = parsed.internal_id.clone();

        if self.find_by_internal_id(ResourceType::Sender, &internal_id).is_some() {
            return Err(ModelError::DuplicateInternalId(internal_id));
        }

        let sender_id = idgen::id(&self.seed, IdKind::Sender, &internal_id);
        let flow_id = idgen::id(&self.seed, IdKind::Flow, &internal_id);
        let source_id = idgen::id(&self.seed, IdKind::Source, &internal_id);

        let bindings = self.resolve_sender_bindings(&parsed)?;

        let first_leg = parsed
            .legs
            .first()
            .ok_or_else(|| ModelError::MissingParent("sender has no media legs".to_string()))?;

        let source = Resource {
            id: source_id,
            resource_type: ResourceType::Source,
            version: Version::now(),
            label: format!("{internal_id} source"),
            description: String::new(),
            tags: HashMap::new(),
            data: ResourceBody::Source(SourceBody {
                format: first_leg.format,
                clock_name: CLOCK_NAME.to_string(),
                grain_rate: parse_grain_rate(first_leg),
                channels: audio_channels(first_leg),
            }),
        };

        let flow = Resource {
            id: flow_id,
            resource_type: ResourceType::Flow,
            version: Version::now(),
            label: format!("{internal_id} flow"),
            description: String::new(),
            tags: HashMap::new(),
            data: ResourceBody::Flow(flow_body_from_leg(first_leg, source_id)),
        };

        let manifest_href = format!(
            "http://{}:{}/x-nmos/connection/v1.1/single/senders/{}/transportfile",
            self.hostname, self.http_port, sender_id
        );

        let mut sender_tags = HashMap::new();
        sender_tags.insert(TAG_INTERNAL_ID.to_string(), vec![internal_id.clone()]);
        if let Some(hint) = &parsed.group_hint {
            sender_tags.insert("urn:x-nvnmos:group-hint".to_string(), vec![hint.clone()]);
        }

        let sender = Resource {
            id: sender_id,
            resource_type: ResourceType::Sender,
            version: Version::now(),
            label: internal_id.clone(),
            description: parsed.session_info.clone().unwrap_or_default(),
            tags: sender_tags,
            data: ResourceBody::Sender(SenderBody {
                transport: "urn:x-nmos:transport:rtp".to_string(),
                flow_id,
                interface_bindings: bindings,
                manifest_href,
            }),
        };

        let transport_params: Vec<Map<String, Value>> =
            parsed.legs.iter().map(sender_leg_transport_params).collect();

        let connection_sender = Resource {
            id: sender_id,
            resource_type: ResourceType::ConnectionSender,
            version: Version::now(),
            label: internal_id.clone(),
            description: String::new(),
            tags: HashMap::new(),
            data: ResourceBody::ConnectionSender(ConnectionSenderBody {
                endpoint_staged: EndpointParams {
                    master_enable: false,
                    activation: Default::default(),
                    transport_params: transport_params.clone(),
                },
                endpoint_active: EndpointParams {
                    master_enable: false,
                    activation: Default::default(),
                    transport_params,
                },
                transport_file_cache: None,
                sdp_skeleton: parsed.clone(),
            }),
        };

        self.resources.insert(source);
        self.resources.insert(flow);
        self.resources.insert(sender);
        self.connections.insert(connection_sender);

        self.resources.modify(self.device_id, |dev| {
            if let ResourceBody::Device(body) = &mut dev.data {
                body.senders.push(sender_id);
            }
        })?;

        self.recompute_interfaces()?;
        self.maintain_clock(&parsed)?;

        Ok(sender_id)
    }

    /// `add_receiver(sdp)` (spec.md §4.4).
    pub fn add_receiver(&self, sdp_text: &str) -> Result<Uuid, ModelError> {
        let parsed = crate::sdp::parser::parse(sdp_text, Role::Receiver)?;
        let internal_id = parsed.internal_id.clone();

        if self.find_by_internal_id(ResourceType::Receiver, &internal_id).is_some() {
            return Err(ModelError::DuplicateInternalId(internal_id));
        }

        let receiver_id = idgen::id(&self.seed, IdKind::Receiver, &internal_id);
        let bindings = self.resolve_receiver_bindings(&parsed)?;

        let first_leg = parsed
            .legs
            .first()
            .ok_or_else(|| ModelError::MissingParent("receiver has no media legs".to_string()))?;

        let caps = build_receiver_caps(&parsed);

        let mut tags = HashMap::new();
        tags.insert(TAG_INTERNAL_ID.to_string(), vec![internal_id.clone()]);

        let receiver = Resource {
            id: receiver_id,
            resource_type: ResourceType::Receiver,
            version: Version::now(),
            label: internal_id.clone(),
            description: parsed.session_info.clone().unwrap_or_default(),
            tags,
            data: ResourceBody::Receiver(ReceiverBody {
                transport: "urn:x-nmos:transport:rtp".to_string(),
                format: first_leg.format,
                accepted_media_types: accepted_media_types(first_leg.format),
                interface_bindings: bindings,
                caps,
            }),
        };

        let transport_params: Vec<Map<String, Value>> =
            parsed.legs.iter().map(receiver_leg_transport_params).collect();

        let connection_receiver = Resource {
            id: receiver_id,
            resource_type: ResourceType::ConnectionReceiver,
            version: Version::now(),
            label: internal_id.clone(),
            description: String::new(),
            tags: HashMap::new(),
            data: ResourceBody::ConnectionReceiver(ConnectionReceiverBody {
                endpoint_staged: EndpointParams {
                    master_enable: false,
                    activation: Default::default(),
                    transport_params: transport_params.clone(),
                },
                endpoint_active: EndpointParams {
                    master_enable: false,
                    activation: Default::default(),
                    transport_params,
                },
                transport_file_staged: None,
                sdp_skeleton: parsed.clone(),
            }),
        };

        self.resources.insert(receiver);
        self.connections.insert(connection_receiver);

        self.resources.modify(self.device_id, |dev| {
            if let ResourceBody::Device(body) = &mut dev.data {
                body.receivers.push(receiver_id);
            }
        })?;

        self.recompute_interfaces()?;
        self.maintain_clock(&parsed)?;

        Ok(receiver_id)
    }

    /// `remove_sender(internal_id)` (spec.md §4.4): cascades to flow then
    /// source (spec.md §8 "Cascade").
    pub fn remove_sender(&self, internal_id: &str) -> Result<(), ModelError> {
        let sender = self
            .find_by_internal_id(ResourceType::Sender, internal_id)
            .ok_or_else(|| ModelError::NotFound(Uuid::nil()))?;
        let ResourceBody::Sender(body) = &sender.data else {
            return Err(ModelError::MissingParent("not a sender".to_string()));
        };
        let flow_id = body.flow_id;
        let flow = self.resources.find(flow_id).ok_or(ModelError::NotFound(flow_id))?;
        let ResourceBody::Flow(flow_body) = &flow.data else {
            return Err(ModelError::MissingParent("not a flow".to_string()));
        };
        let source_id = flow_body.source_id;

        self.connections.erase(sender.id)?;
        self.resources.erase(sender.id)?;
        self.resources.erase(flow_id)?;
        self.resources.erase(source_id)?;

        self.resources.modify(self.device_id, |dev| {
            if let ResourceBody::Device(d) = &mut dev.data {
                d.senders.retain(|id| *id != sender.id);
            }
        })?;

        self.recompute_interfaces()?;
        self.recompute_clock_after_removal()?;
        Ok(())
    }

    pub fn remove_receiver(&self, internal_id: &str) -> Result<(), ModelError> {
        let receiver = self
            .find_by_internal_id(ResourceType::Receiver, internal_id)
            .ok_or_else(|| ModelError::NotFound(Uuid::nil()))?;

        self.connections.erase(receiver.id)?;
        self.resources.erase(receiver.id)?;

        self.resources.modify(self.device_id, |dev| {
            if let ResourceBody::Device(d) = &mut dev.data {
                d.receivers.retain(|id| *id != receiver.id);
            }
        })?;

        self.recompute_interfaces()?;
        self.recompute_clock_after_removal()?;
        Ok(())
    }

    fn resolve_sender_bindings(&self, parsed: &ParsedSdp) -> Result<Vec<String>, ModelError> {
        parsed
            .legs
            .iter()
            .map(|leg| {
                let ip = leg
                    .sender
                    .as_ref()
                    .and_then(|s| s.source_ip.clone())
                    .ok_or_else(|| ModelError::NoMatchingInterface("<none>".to_string()))?;
                if self.known_interfaces.iter().any(|known| known == &ip) {
                    Ok(ip)
                } else {
                    Err(ModelError::NoMatchingInterface(ip))
                }
            })
            .collect()
    }

    fn resolve_receiver_bindings(&self, parsed: &ParsedSdp) -> Result<Vec<String>, ModelError> {
        parsed
            .legs
            .iter()
            .map(|leg| {
                let ip = leg
                    .receiver
                    .as_ref()
                    .and_then(|r| r.interface_ip.clone())
                    .ok_or_else(|| ModelError::NoMatchingInterface("<none>".to_string()))?;
                if self.known_interfaces.iter().any(|known| known == &ip) {
                    Ok(ip)
                } else {
                    Err(ModelError::NoMatchingInterface(ip))
                }
            })
            .collect()
    }

    /// Recomputes the node's `interfaces[]` as exactly the union of every
    /// sender's/receiver's `interface_bindings[]` (spec.md §3 invariant 2),
    /// mutating the node only if the set actually changed.
    fn recompute_interfaces(&self) -> Result<(), ModelError> {
        let mut union: Vec<String> = Vec::new();
        for sender in self.resources.iter(ResourceType::Sender) {
            if let ResourceBody::Sender(body) = sender.data {
                for iface in body.interface_bindings {
                    if !union.contains(&iface) {
                        union.push(iface);
                    }
                }
            }
        }
        for receiver in self.resources.iter(ResourceType::Receiver) {
            if let ResourceBody::Receiver(body) = receiver.data {
                for iface in body.interface_bindings {
                    if !union.contains(&iface) {
                        union.push(iface);
                    }
                }
            }
        }
        union.sort();

        let node = self.resources.find(self.node_id).ok_or(ModelError::NotFound(self.node_id))?;
        let ResourceBody::Node(node_body) = &node.data else {
            return Err(ModelError::MissingParent("node resource missing its body".to_string()));
        };
        let mut current = node_body.interfaces.clone();
        current.sort();
        if current == union {
            return Ok(());
        }
        self.resources.modify(self.node_id, |n| {
            if let ResourceBody::Node(body) = &mut n.data {
                body.interfaces = union;
            }
        })?;
        Ok(())
    }

    /// Clock maintenance (spec.md §4.4): a sender with PTP `ts-refclk`
    /// upgrades the named internal clock to PTP, carrying the configured
    /// `ptp_domain_number` forward when the SDP omits a domain.
    fn maintain_clock(&self, parsed: &ParsedSdp) -> Result<(), ModelError> {
        let carried_over_domain = self.settings.read().ptp_domain_number;
        let derived = derive_clock(parsed, CLOCK_NAME, carried_over_domain);
        self.apply_clock(derived)
    }

    fn apply_clock(&self, derived: NodeClock) -> Result<(), ModelError> {
        let node = self.resources.find(self.node_id).ok_or(ModelError::NotFound(self.node_id))?;
        let ResourceBody::Node(body) = &node.data else {
            return Err(ModelError::MissingParent("node resource missing its body".to_string()));
        };
        let current = body.clocks.iter().find(|c| c.name() == derived.name());
        if current == Some(&derived) {
            return Ok(());
        }
        self.resources.modify(self.node_id, |n| {
            if let ResourceBody::Node(b) = &mut n.data {
                if let Some(existing) = b.clocks.iter_mut().find(|c| c.name() == derived.name()) {
                    *existing = derived;
                } else {
                    b.clocks.push(derived);
                }
            }
        })?;
        Ok(())
    }

    /// After a removal, recomputes the clock from whatever PTP-carrying
    /// senders/receivers remain; falls back to internal if none do (spec.md
    /// §3 invariant 3, "...and vice versa when the last such sender is
    /// removed").
    fn recompute_clock_after_removal(&self) -> Result<(), ModelError> {
        let carried_over_domain = self.settings.read().ptp_domain_number;
        let mut derived = NodeClock::Internal {
            name: CLOCK_NAME.to_string(),
        };
        for sender in self.resources.iter(ResourceType::Sender) {
            let ResourceBody::Sender(_) = sender.data else { continue };
            let Some(conn) = self.connections.find(sender.id) else { continue };
            let ResourceBody::ConnectionSender(conn_body) = conn.data else { continue };
            let candidate = derive_clock(&conn_body.sdp_skeleton, CLOCK_NAME, carried_over_domain);
            if matches!(candidate, NodeClock::Ptp { .. }) {
                derived = candidate;
                break;
            }
        }
        self.apply_clock(derived)
    }
}

fn asset_tags_to_tags(tags: &AssetTags) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    if !tags.manufacturer.is_empty() {
        out.insert("urn:x-nvnmos:manufacturer".to_string(), vec![tags.manufacturer.clone()]);
    }
    if !tags.product.is_empty() {
        out.insert("urn:x-nvnmos:product".to_string(), vec![tags.product.clone()]);
    }
    if !tags.instance_id.is_empty() {
        out.insert("urn:x-nvnmos:instance-id".to_string(), vec![tags.instance_id.clone()]);
    }
    if !tags.functions.is_empty() {
        out.insert("urn:x-nmos:tag:asset:function/v1.0".to_string(), tags.functions.clone());
    }
    out
}

fn parse_grain_rate(leg: &MediaLeg) -> Option<(u32, u32)> {
    let raw = leg.fmtp.get("exactframerate")?;
    match raw.split_once('/') {
        Some((num, den)) => Some((num.parse().ok()?, den.parse().ok()?)),
        None => Some((raw.parse().ok()?, 1)),
    }
}

fn audio_channels(leg: &MediaLeg) -> Vec<ChannelInfo> {
    let Some((_, _, Some(channels))) = parse_rtpmap(leg) else {
        return Vec::new();
    };
    (0..channels)
        .map(|i| ChannelInfo {
            label: format!("Channel {}", i + 1),
            symbol: format!("CH{}", i + 1),
        })
        .collect()
}

/// Recovers `a=rtpmap:<pt> <encoding>/<clockrate>[/<channels>]` from the
/// attributes this codec does not otherwise model structurally.
fn parse_rtpmap(leg: &MediaLeg) -> Option<(String, u32, Option<u32>)> {
    let attr = leg.other_attributes.iter().find(|a| a.name == "rtpmap")?;
    let value = attr.value.as_ref()?;
    let (_, rest) = value.split_once(' ')?;
    let mut parts = rest.split('/');
    let encoding = parts.next()?.to_string();
    let clock_rate: u32 = parts.next()?.parse().ok()?;
    let channels = parts.next().and_then(|c| c.parse().ok());
    Some((encoding, clock_rate, channels))
}

fn flow_body_from_leg(leg: &MediaLeg, source_id: Uuid) -> FlowBody {
    let width = leg.fmtp.get("width").and_then(|v| v.parse().ok());
    let height = leg.fmtp.get("height").and_then(|v| v.parse().ok());
    let interlace_mode = leg.fmtp.get("interlace").cloned();
    let colorspace = leg.fmtp.get("sampling").cloned();
    let rtpmap = parse_rtpmap(leg);
    let (sample_rate, sample_depth) = match &rtpmap {
        Some((encoding, clock_rate, _)) if leg.format == MediaFormat::Audio => {
            let depth = encoding.trim_start_matches(['L', 'l']).parse().ok();
            (Some((*clock_rate, 1)), depth)
        }
        _ => (None, None),
    };
    let format_bit_rate = crate::sdp::bitrate::format_bit_rate(&leg.fmtp, leg.bandwidth_as.map(|b| b as f64));

    FlowBody {
        format: leg.format,
        source_id,
        frame_width: width,
        frame_height: height,
        interlace_mode,
        colorspace,
        sample_rate,
        sample_depth,
        did_sdid: Vec::new(),
        bit_rate: format_bit_rate,
    }
}

fn accepted_media_types(format: MediaFormat) -> Vec<String> {
    match format {
        MediaFormat::Video => vec!["video/raw".to_string(), "video/jxsv".to_string()],
        MediaFormat::Audio => vec!["audio/L16".to_string(), "audio/L24".to_string()],
        MediaFormat::Data => vec!["video/smpte291".to_string()],
        MediaFormat::Mux => vec!["video/smpte2022-6".to_string()],
    }
}

fn constraint(values: Vec<Value>) -> ConstraintParam {
    ConstraintParam {
        enum_values: Some(values),
    }
}

/// Builds the constraint-set array spec.md §4.4 describes for
/// video-raw/audio/JPEG-XS receivers.
fn build_receiver_caps(parsed: &ParsedSdp) -> ReceiverCaps {
    let Some(leg) = parsed.legs.first() else {
        return ReceiverCaps::default();
    };
    let mut set: ConstraintSet = HashMap::new();

    match leg.format {
        MediaFormat::Video => {
            if let Some((num, den)) = parse_grain_rate(leg) {
                set.insert(
                    "urn:x-nmos:cap:format:grain_rate".to_string(),
                    constraint(vec![json!({"numerator": num, "denominator": den})]),
                );
            }
            if let Some(w) = leg.fmtp.get("width").and_then(|v| v.parse::<u32>().ok()) {
                set.insert("urn:x-nmos:cap:format:frame_width".to_string(), constraint(vec![json!(w)]));
            }
            if let Some(h) = leg.fmtp.get("height").and_then(|v| v.parse::<u32>().ok()) {
                set.insert("urn:x-nmos:cap:format:frame_height".to_string(), constraint(vec![json!(h)]));
            }
            if let Some(mode) = leg.fmtp.get("interlace") {
                set.insert("urn:x-nmos:cap:format:interlace_mode".to_string(), constraint(vec![json!(mode)]));
            }
            if let Some(sampling) = leg.fmtp.get("sampling") {
                set.insert("urn:x-nmos:cap:format:color_sampling".to_string(), constraint(vec![json!(sampling)]));
            }
            if let Some(profile) = leg.fmtp.get("profile") {
                // JPEG XS: same leg carries both video-raw-style and JPEG-XS-specific keys.
                set.insert("urn:x-nmos:cap:format:profile".to_string(), constraint(vec![json!(profile)]));
                if let Some(level) = leg.fmtp.get("level") {
                    set.insert("urn:x-nmos:cap:format:level".to_string(), constraint(vec![json!(level)]));
                }
                if let Some(sublevel) = leg.fmtp.get("sublevel") {
                    set.insert("urn:x-nmos:cap:format:sublevel".to_string(), constraint(vec![json!(sublevel)]));
                }
                let format_rate = crate::sdp::bitrate::format_bit_rate(&leg.fmtp, leg.bandwidth_as.map(|b| b as f64));
                if let Some(rate) = format_rate {
                    set.insert("urn:x-nmos:cap:format:bit_rate".to_string(), constraint(vec![json!(rate)]));
                }
                let transport_rate = crate::sdp::bitrate::transport_bit_rate(
                    &leg.fmtp,
                    format_rate,
                    leg.bandwidth_as.map(|b| b as f64),
                );
                if let Some(rate) = transport_rate {
                    set.insert("urn:x-nmos:cap:transport:bit_rate".to_string(), constraint(vec![json!(rate)]));
                }
                if let Some(mode) = leg.fmtp.get("packetmode") {
                    set.insert(
                        "urn:x-nmos:cap:transport:packet_transmission_mode".to_string(),
                        constraint(vec![json!(mode)]),
                    );
                }
            }
        }
        MediaFormat::Audio => {
            if let Some((encoding, clock_rate, channels)) = parse_rtpmap(leg) {
                if let Some(depth) = encoding.trim_start_matches(['L', 'l']).parse::<u32>().ok() {
                    set.insert("urn:x-nmos:cap:format:sample_depth".to_string(), constraint(vec![json!(depth)]));
                }
                set.insert(
                    "urn:x-nmos:cap:format:sample_rate".to_string(),
                    constraint(vec![json!({"numerator": clock_rate, "denominator": 1})]),
                );
                if let Some(ch) = channels {
                    set.insert("urn:x-nmos:cap:format:channel_count".to_string(), constraint(vec![json!(ch)]));
                }
            }
            if let Some(ptime) = leg.fmtp.get("ptime") {
                set.insert("urn:x-nmos:cap:transport:packet_time".to_string(), constraint(vec![json!(ptime)]));
            }
            if let Some(maxptime) = leg.fmtp.get("maxptime") {
                set.insert("urn:x-nmos:cap:transport:max_packet_time".to_string(), constraint(vec![json!(maxptime)]));
            }
        }
        MediaFormat::Data | MediaFormat::Mux => {}
    }

    ReceiverCaps {
        constraint_sets: vec![set],
    }
}

pub fn sender_leg_transport_params(leg: &MediaLeg) -> Map<String, Value> {
    let sender = leg.sender.as_ref();
    let mut map = Map::new();
    map.insert(
        "source_ip".to_string(),
        sender.and_then(|s| s.source_ip.clone()).map(Value::from).unwrap_or(json!("auto")),
    );
    map.insert(
        "destination_ip".to_string(),
        sender.and_then(|s| s.destination_ip.clone()).map(Value::from).unwrap_or(json!("auto")),
    );
    map.insert(
        "destination_port".to_string(),
        json!(sender.map(|s| s.destination_port).unwrap_or(leg.port)),
    );
    map.insert(
        "source_port".to_string(),
        sender.and_then(|s| s.source_port).map(|p| json!(p)).unwrap_or(json!("auto")),
    );
    map.insert("rtp_enabled".to_string(), json!(sender.map(|s| s.rtp_enabled).unwrap_or(true)));
    map
}

pub fn receiver_leg_transport_params(leg: &MediaLeg) -> Map<String, Value> {
    let receiver = leg.receiver.as_ref();
    let mut map = Map::new();
    map.insert(
        "interface_ip".to_string(),
        receiver.and_then(|r| r.interface_ip.clone()).map(Value::from).unwrap_or(json!("auto")),
    );
    map.insert(
        "multicast_ip".to_string(),
        receiver.and_then(|r| r.multicast_ip.clone()).map(Value::from).unwrap_or(Value::Null),
    );
    map.insert(
        "source_ip".to_string(),
        receiver.and_then(|r| r.source_ip.clone()).map(Value::from).unwrap_or(Value::Null),
    );
    map.insert(
        "destination_port".to_string(),
        json!(receiver.map(|r| r.destination_port).unwrap_or(leg.port)),
    );
    map.insert("rtp_enabled".to_string(), json!(receiver.map(|r| r.rtp_enabled).unwrap_or(true)));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;

    const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
a=mediaclk:direct=0\r\n\
a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080\r\n";

    fn model() -> NodeModel {
        let mut config = NodeConfig::minimal("nmos-api.local:8080", "nmos-api.local");
        config.host_addresses = vec!["192.0.2.10".to_string()];
        NodeModel::init(&config, Arc::new(RwLock::new(Settings::default()))).unwrap()
    }

    #[test]
    fn scenario_1_start_has_internal_clock_and_empty_interfaces() {
        let m = model();
        let node = m.resources.find(m.node_id()).unwrap();
        let ResourceBody::Node(body) = node.data else { panic!() };
        assert_eq!(body.clocks.len(), 1);
        assert!(body.interfaces.is_empty());
        assert_eq!(
            m.node_id(),
            idgen::id("nmos-api.local:8080", IdKind::Node, "")
        );
    }

    #[test]
    fn scenario_2_add_sender_upgrades_clock_and_interfaces() {
        let m = model();
        let sender_id = m.add_sender(VIDEO_SDP).unwrap();
        assert_eq!(sender_id, idgen::id("nmos-api.local:8080", IdKind::Sender, "sink-0"));

        let node = m.resources.find(m.node_id()).unwrap();
        let ResourceBody::Node(body) = node.data else { panic!() };
        assert!(body.interfaces.contains(&"192.0.2.10".to_string()));
        assert!(matches!(
            body.clocks.iter().find(|c| c.name() == CLOCK_NAME).unwrap(),
            NodeClock::Ptp { gmid, .. } if gmid == "ac-de-48-23-45-67-01-9f"
        ));
    }

    #[test]
    fn remove_then_readd_is_same_uuid_higher_version() {
        let m = model();
        let first = m.add_sender(VIDEO_SDP).unwrap();
        let v1 = m.resources.find(first).unwrap().version;
        m.remove_sender("sink-0").unwrap();
        let second = m.add_sender(VIDEO_SDP).unwrap();
        let v2 = m.resources.find(second).unwrap().version;
        assert_eq!(first, second);
        assert!(v2 > v1);
    }

    #[test]
    fn cascade_removes_sender_flow_and_source() {
        let m = model();
        m.add_sender(VIDEO_SDP).unwrap();
        let sender = m.find_by_internal_id(ResourceType::Sender, "sink-0").unwrap();
        let ResourceBody::Sender(sb) = &sender.data else { panic!() };
        let flow_id = sb.flow_id;
        let flow = m.resources.find(flow_id).unwrap();
        let ResourceBody::Flow(fb) = &flow.data else { panic!() };
        let source_id = fb.source_id;

        m.remove_sender("sink-0").unwrap();
        assert!(m.resources.find(sender.id).is_none());
        assert!(m.resources.find(flow_id).is_none());
        assert!(m.resources.find(source_id).is_none());
    }

    const AUDIO_SDP: &str = "v=0\r\no=- 1 1 IN IP4 192.0.2.10\r\ns=r-0\r\nt=0 0\r\n\
a=x-nvnmos-id:r-0\r\nm=audio 6000 RTP/AVP 97\r\nc=IN IP4 239.1.1.1/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\na=rtpmap:97 L24/48000/2\r\n";

    #[test]
    fn scenario_4_receiver_capability_constraint_set() {
        let m = model();
        let receiver_id = m.add_receiver(AUDIO_SDP).unwrap();
        let receiver = m.resources.find(receiver_id).unwrap();
        let ResourceBody::Receiver(body) = receiver.data else { panic!() };
        let set = &body.caps.constraint_sets[0];
        assert_eq!(
            set.get("urn:x-nmos:cap:format:channel_count").unwrap().enum_values,
            Some(vec![json!(2)])
        );
        assert_eq!(
            set.get("urn:x-nmos:cap:format:sample_rate").unwrap().enum_values,
            Some(vec![json!({"numerator": 48000, "denominator": 1})])
        );
        assert_eq!(
            set.get("urn:x-nmos:cap:format:sample_depth").unwrap().enum_values,
            Some(vec![json!(24)])
        );
    }
}
