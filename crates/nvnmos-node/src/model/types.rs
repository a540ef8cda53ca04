//! Type-specific resource bodies (spec.md §3 data model table).
//!
//! Transport-parameter legs are kept as loose `serde_json::Map` objects
//! rather than fully typed structs: spec.md §4.5 is explicit that the PATCH
//! validator only checks IS-05 schema shape, not semantics, so a typed leg
//! struct would just be a JSON map with extra ceremony wrapped around it —
//! the same call `rvoip_session_core` makes for SDP media attributes it
//! doesn't interpret.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::sdp::clock::NodeClock;
use crate::sdp::types::{MediaFormat, ParsedSdp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeBody {
    pub interfaces: Vec<String>,
    pub clocks: Vec<NodeClock>,
    pub hostname: String,
    pub href: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRef {
    pub href: String,
    #[serde(rename = "type")]
    pub control_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceBody {
    #[serde(rename = "type")]
    pub device_type: String,
    pub controls: Vec<ControlRef>,
    /// Deprecated but still required by IS-04 v1.3/v1.2 clients.
    pub senders: Vec<Uuid>,
    pub receivers: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub label: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBody {
    pub format: MediaFormat,
    pub clock_name: String,
    pub grain_rate: Option<(u32, u32)>,
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowBody {
    pub format: MediaFormat,
    pub source_id: Uuid,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub interlace_mode: Option<String>,
    pub colorspace: Option<String>,
    pub sample_rate: Option<(u32, u32)>,
    pub sample_depth: Option<u32>,
    #[serde(default)]
    pub did_sdid: Vec<(u8, u8)>,
    pub bit_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderBody {
    pub transport: String,
    pub flow_id: Uuid,
    pub interface_bindings: Vec<String>,
    pub manifest_href: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintParam {
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

pub type ConstraintSet = HashMap<String, ConstraintParam>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiverCaps {
    pub constraint_sets: Vec<ConstraintSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverBody {
    pub transport: String,
    pub format: MediaFormat,
    pub accepted_media_types: Vec<String>,
    pub interface_bindings: Vec<String>,
    pub caps: ReceiverCaps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    ActivateImmediate,
    ActivateScheduledAbsolute,
    ActivateScheduledRelative,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub mode: Option<ActivationMode>,
    pub requested_time: Option<String>,
    pub activation_time: Option<String>,
}

/// One sender/receiver endpoint (staged or active), spec.md §3/§4.5.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointParams {
    pub master_enable: bool,
    pub activation: ActivationRecord,
    /// One entry per leg; field names/values are whatever the IS-05 schema
    /// allows, including the literal string `"auto"`.
    pub transport_params: Vec<Map<String, Value>>,
}

/// Not `Deserialize`: connection resources are only ever constructed by
/// [`crate::model::node_model::NodeModel`], never parsed back from JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSenderBody {
    pub endpoint_staged: EndpointParams,
    pub endpoint_active: EndpointParams,
    /// The rendered `/transportfile` body, refreshed on every activation.
    #[serde(skip)]
    pub transport_file_cache: Option<String>,
    /// The original SDP skeleton this sender was created from — kept for
    /// the transport-file synthesizer (spec.md §4.5) and never exposed over
    /// the wire.
    #[serde(skip)]
    pub sdp_skeleton: ParsedSdp,
}

/// See [`ConnectionSenderBody`] on why this is not `Deserialize`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReceiverBody {
    pub endpoint_staged: EndpointParams,
    pub endpoint_active: EndpointParams,
    /// Client-supplied (staged) transport file SDP, if any.
    pub transport_file_staged: Option<String>,
    #[serde(skip)]
    pub sdp_skeleton: ParsedSdp,
}
