//! Typed views over SDP (RFC 4566) session- and media-level data, extended
//! with the custom `x-nvnmos-*` attributes (spec.md §4.2, §6).
//!
//! These shapes mirror the field names of the published IS-05 transport
//! parameter schemas (not reproduced here) rather than a generic attribute
//! bag, the way `rvoip_sip_core::types::sdp` prefers dedicated structs
//! (`CandidateAttribute`, `RidAttribute`, ...) over stringly-typed maps for
//! anything with known structure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The `o=` origin line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub username: String,
    pub sess_id: String,
    pub sess_version: String,
    pub net_type: String,
    pub addr_type: String,
    pub unicast_address: String,
}

/// A `c=` connection-data line, session- or media-level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionData {
    pub net_type: String,
    pub addr_type: String,
    pub connection_address: String,
    /// Time-to-live for IPv4 multicast (`c=IN IP4 <addr>/<ttl>`).
    pub ttl: Option<u8>,
}

/// `a=source-filter: incl IN IP4 <dest> <src> [<src> ...]` (RFC 4570), used
/// to recover a receiver's expected source address for SSM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    pub mode: SourceFilterMode,
    pub destination_address: String,
    pub source_addresses: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFilterMode {
    Incl,
    Excl,
}

/// A parsed `a=ts-refclk` attribute (SMPTE 2110-10 / ST 2059 clock
/// reference), session- or media-level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TsRefClk {
    /// `ts-refclk:ptp=<version>:<gmid>[:<domain>]`
    Ptp {
        version: String,
        gmid: String,
        domain: Option<u8>,
    },
    /// `ts-refclk:ptp=traceable`
    PtpTraceable,
    /// `ts-refclk:localmac=<mac>`
    LocalMac(String),
    /// Any other clock reference source this node does not interpret.
    Other(String),
}

/// Sender-side leg transport parameters (IS-05 `sender_transport_params`
/// shape, spec.md §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderTransportParams {
    /// Interface to transmit from (`a=x-nvnmos-iface-ip`).
    pub source_ip: Option<String>,
    /// `c=` connection address or the inclusive `source-filter` destination.
    pub destination_ip: Option<String>,
    /// Destination port, from the `m=` line.
    pub destination_port: u16,
    /// `a=x-nvnmos-src-port`, `None` means unresolved ("auto").
    pub source_port: Option<u16>,
    /// `false` iff the media description carries `a=inactive`.
    pub rtp_enabled: bool,
}

impl SenderTransportParams {
    pub fn unresolved(destination_port: u16) -> Self {
        Self {
            source_ip: None,
            destination_ip: None,
            destination_port,
            source_port: None,
            rtp_enabled: true,
        }
    }
}

/// Receiver-side leg transport parameters (IS-05 `receiver_transport_params`
/// shape, spec.md §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverTransportParams {
    /// Interface to receive on (`a=x-nvnmos-iface-ip`).
    pub interface_ip: Option<String>,
    /// Multicast group address, from the media `c=`.
    pub multicast_ip: Option<String>,
    /// Expected source address, from `source-filter`.
    pub source_ip: Option<String>,
    /// Destination port, from the `m=` line.
    pub destination_port: u16,
    /// `false` iff the media description carries `a=inactive`.
    pub rtp_enabled: bool,
}

impl ReceiverTransportParams {
    pub fn unresolved(destination_port: u16) -> Self {
        Self {
            interface_ip: None,
            multicast_ip: None,
            source_ip: None,
            destination_port,
            rtp_enabled: true,
        }
    }
}

/// Which shape of leg transport params to populate while parsing — the SDP
/// text alone doesn't say whether it describes a sender or a receiver; the
/// caller (`NodeModel::add_sender` vs `add_receiver`) knows that and passes
/// it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

/// Media-type classification returned by format detection (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFormat {
    Video,
    Audio,
    Data,
    Mux,
}

/// One `m=` media description plus everything hung off it: its own
/// connection data, bandwidth, fmtp parameters (including the custom
/// `x-nvnmos-*` ones), and `ts-refclk` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaLeg {
    /// Raw `m=` media type token (`"video"`, `"audio"`, `"application"`).
    pub media_type: String,
    pub format: MediaFormat,
    pub port: u16,
    pub proto: String,
    pub fmt: String,
    pub connection: Option<ConnectionData>,
    pub source_filter: Option<SourceFilter>,
    pub bandwidth_as: Option<u64>,
    /// Raw `a=fmtp` parameters for `fmt`, including `x-nvnmos-format-bit-rate`
    /// / `x-nvnmos-transport-bit-rate` if present.
    pub fmtp: HashMap<String, String>,
    pub ts_refclk: Vec<TsRefClk>,
    pub media_clock: Option<String>,
    pub sender: Option<SenderTransportParams>,
    pub receiver: Option<ReceiverTransportParams>,
    /// Attributes not otherwise modeled, preserved verbatim for round-trip
    /// fidelity (testable property in spec.md §8).
    pub other_attributes: Vec<RawAttribute>,
}

/// A generic `a=<name>[:<value>]` attribute kept for attributes this codec
/// does not give a dedicated field, so re-emission does not lose data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttribute {
    pub name: String,
    pub value: Option<String>,
}

/// Session-level parameters sufficient to reconstruct everything outside
/// the per-leg transport params (spec.md §4.2 "Parse", part a).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    pub origin: Origin,
    pub session_name: String,
    pub connection: Option<ConnectionData>,
    pub time_active: (String, String),
    pub group: Option<(String, Vec<String>)>,
    pub ts_refclk: Vec<TsRefClk>,
    pub media_clock: Option<String>,
    pub other_attributes: Vec<RawAttribute>,
}

/// The full result of [`crate::sdp::parser::parse`] (spec.md §4.2 "Parse").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSdp {
    pub session: SessionParams,
    pub legs: Vec<MediaLeg>,
    /// `a=x-nvnmos-id`, session-level, required.
    pub internal_id: String,
    /// `a=x-nvnmos-group-hint`, session-level, optional.
    pub group_hint: Option<String>,
    /// `i=` session information line.
    pub session_info: Option<String>,
}

impl ParsedSdp {
    /// Whether any leg is an RTP sender (has `sender` transport params).
    pub fn is_sender(&self) -> bool {
        self.legs.iter().any(|l| l.sender.is_some())
    }

    /// The session-level `ts-refclk`, used as the default for any leg with
    /// none of its own (spec.md §4.2 "Clock").
    pub fn effective_ts_refclk<'a>(&'a self, leg: &'a MediaLeg) -> &'a [TsRefClk] {
        if leg.ts_refclk.is_empty() {
            &self.session.ts_refclk
        } else {
            &leg.ts_refclk
        }
    }
}
